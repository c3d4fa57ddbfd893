use std::io::{BufRead, Write};

use lua_runtime::channel::Dispatcher;
use lua_runtime::cli::{self, Action, CliArgs, USAGE};
use lua_runtime::{logging, Runtime, RuntimeConfig, RuntimeError};

fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("lua-runtime: {e}");
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };
    if args.help {
        println!("{USAGE}");
        return;
    }

    let config = match RuntimeConfig::resolve(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("lua-runtime: config {e}");
            std::process::exit(1);
        }
    };
    logging::init(&config.log_level);
    tracing::debug!(?config, "configuration resolved");

    let runtime = Runtime::new(config);

    let ok = if args.channel {
        serve_channel(&runtime)
    } else if args.actions.is_empty() {
        repl(&runtime, &args)
    } else {
        run_actions(&runtime, &args)
    };

    if !ok {
        std::process::exit(1);
    }
}

fn report(result: Result<String, RuntimeError>, quiet: bool) -> bool {
    match result {
        Ok(value) => {
            if !quiet {
                println!("{value}");
            }
            true
        }
        Err(e) => {
            eprintln!("lua-runtime: {e}");
            false
        }
    }
}

/// Run every action even after a failure; return whether all succeeded.
fn run_actions(runtime: &Runtime, args: &CliArgs) -> bool {
    let mut all_ok = true;
    for action in &args.actions {
        let ok = match action {
            Action::Eval(code) => report(runtime.eval(code), args.quiet),
            Action::File(path) => report(runtime.eval_file(path), args.quiet),
            Action::Reset => {
                runtime.reset();
                true
            }
        };
        all_ok &= ok;
    }
    all_ok
}

/// One JSON method call per stdin line, one JSON reply per stdout line.
fn serve_channel(runtime: &Runtime) -> bool {
    let dispatcher = Dispatcher::new(runtime);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("lua-runtime: stdin: {e}");
                return false;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let reply = dispatcher.handle_line(&line);
        if writeln!(stdout, "{reply}").and_then(|_| stdout.flush()).is_err() {
            return false;
        }
    }
    true
}

/// Read-eval-print loop.  Lines are accumulated while the chunk is
/// syntactically incomplete.
fn repl(runtime: &Runtime, args: &CliArgs) -> bool {
    let interactive = unsafe {
        libc::isatty(libc::STDIN_FILENO) != 0 && libc::isatty(libc::STDOUT_FILENO) != 0
    };
    let prompt = |continuation: bool| {
        if interactive {
            print!("{}", if continuation { ">> " } else { "> " });
            let _ = std::io::stdout().flush();
        }
    };

    let mut all_ok = true;
    let mut pending = String::new();
    let stdin = std::io::stdin();
    prompt(false);
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if !pending.is_empty() {
            pending.push('\n');
        }
        pending.push_str(&line);

        match runtime.eval(&pending) {
            Err(err) if err.is_incomplete() => {
                prompt(true);
                continue;
            }
            result => all_ok &= report(result, args.quiet),
        }
        pending.clear();
        prompt(false);
    }
    if !pending.is_empty() {
        all_ok &= report(runtime.eval(&pending), args.quiet);
    }
    all_ok
}
