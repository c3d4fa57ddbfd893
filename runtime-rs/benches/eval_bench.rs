use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lua_runtime::Runtime;

fn bench_eval(c: &mut Criterion) {
    let rt = Runtime::default();
    rt.eval("function fib(n) if n < 2 then return n end return fib(n - 1) + fib(n - 2) end")
        .unwrap();

    let mut g = c.benchmark_group("eval");

    g.bench_function("expression", |b| {
        b.iter(|| rt.eval(black_box("1 + 1")).unwrap())
    });
    g.bench_function("statement", |b| {
        b.iter(|| rt.eval(black_box("local t = {} for i = 1, 10 do t[i] = i end")).unwrap())
    });
    g.bench_function("inspect_table", |b| {
        b.iter(|| rt.eval(black_box("{1, 2, 3, name = 'x', nested = {true, false}}")).unwrap())
    });
    g.bench_function("fib_15", |b| {
        b.iter(|| rt.eval(black_box("fib(15)")).unwrap())
    });
    g.bench_function("script_error", |b| {
        b.iter(|| rt.eval(black_box("error('x')")).unwrap_err())
    });

    g.finish();
}

fn bench_reset(c: &mut Criterion) {
    let rt = Runtime::default();
    c.bench_function("reset_and_first_eval", |b| {
        b.iter(|| {
            rt.reset();
            rt.eval(black_box("1")).unwrap()
        })
    });
}

criterion_group!(benches, bench_eval, bench_reset);
criterion_main!(benches);
