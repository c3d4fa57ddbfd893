//! `inspect(value)`: the describe routine for non-textual results.
//!
//! Installed as a Lua global on every instance, and used by the engine
//! through the same function handle, so `inspect(v)` in a script and the
//! engine's rendering of `v` always agree.
//!
//! | Value                          | Rendering                               |
//! |--------------------------------|-----------------------------------------|
//! | nil, boolean, number           | `tostring(v)`                           |
//! | function, thread, userdata     | `tostring(v)` (honours `__tostring`)    |
//! | string                         | double-quoted, C-style escapes          |
//! | table with `__inspect`         | result of `__inspect(t)`; nil → nothing |
//! | table with `__tostring`        | `tostring(t)`                           |
//! | other table                    | `{1, 2, key = v, [k] = v}`              |
//!
//! Nested tables beyond the depth limit render as `{...}`, cycles as
//! `<cycle>`.  Errors raised by metamethods propagate to the caller.

use mlua::prelude::*;

const LUA_KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if",
    "in", "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// Create the `inspect` function, register it as a global, and return it.
///
/// `tostring` is captured here so that scripts redefining the global do not
/// change how results are rendered.
pub fn install(lua: &Lua, max_depth: usize) -> LuaResult<LuaFunction> {
    let tostring: LuaFunction = lua.globals().get("tostring")?;
    let inspect = lua.create_function(move |_, value: LuaValue| {
        let mut writer = Writer {
            tostring: &tostring,
            max_depth,
            open: Vec::new(),
        };
        writer.render(&value, 0)
    })?;
    lua.globals().set("inspect", inspect.clone())?;
    Ok(inspect)
}

struct Writer<'a> {
    tostring: &'a LuaFunction,
    max_depth: usize,
    /// Tables currently being rendered, outermost first.
    open: Vec<LuaTable>,
}

impl Writer<'_> {
    fn render(&mut self, value: &LuaValue, depth: usize) -> LuaResult<String> {
        match value {
            LuaValue::Nil => Ok("nil".to_owned()),
            LuaValue::Boolean(b) => Ok(b.to_string()),
            LuaValue::Integer(i) => Ok(i.to_string()),
            LuaValue::String(s) => Ok(quote(&s.to_string_lossy())),
            LuaValue::Table(t) => self.table(t, depth),
            other => self.tostring.call::<String>(other.clone()),
        }
    }

    fn table(&mut self, t: &LuaTable, depth: usize) -> LuaResult<String> {
        if let Some(mt) = t.metatable() {
            if let LuaValue::Function(f) = mt.raw_get::<LuaValue>("__inspect")? {
                return match f.call::<LuaValue>(t.clone())? {
                    LuaValue::Nil => Ok(String::new()),
                    LuaValue::String(s) => Ok(s.to_string_lossy().to_string()),
                    other => Err(LuaError::RuntimeError(format!(
                        "'__inspect' must return a string (got {})",
                        other.type_name()
                    ))),
                };
            }
            if !matches!(mt.raw_get::<LuaValue>("__tostring")?, LuaValue::Nil) {
                return self.tostring.call::<String>(t.clone());
            }
        }

        if self.open.contains(t) {
            return Ok("<cycle>".to_owned());
        }
        if depth >= self.max_depth {
            return Ok("{...}".to_owned());
        }

        self.open.push(t.clone());
        let parts = self.entries(t, depth);
        self.open.pop();

        let parts = parts?;
        if parts.is_empty() {
            Ok("{}".to_owned())
        } else {
            Ok(format!("{{{}}}", parts.join(", ")))
        }
    }

    /// Array part in index order, then the remaining entries sorted by key.
    fn entries(&mut self, t: &LuaTable, depth: usize) -> LuaResult<Vec<String>> {
        let len = t.raw_len() as i64;
        let mut parts = Vec::new();
        for i in 1..=len {
            let v: LuaValue = t.raw_get(i)?;
            parts.push(self.render(&v, depth + 1)?);
        }

        let mut keyed: Vec<(String, String)> = Vec::new();
        for pair in t.clone().pairs::<LuaValue, LuaValue>() {
            let (k, v) = pair?;
            if let LuaValue::Integer(i) = k {
                if (1..=len).contains(&i) {
                    continue;
                }
            }
            let key = match &k {
                LuaValue::String(s) => {
                    let s = s.to_string_lossy().to_string();
                    if is_identifier(&s) {
                        s
                    } else {
                        format!("[{}]", quote(&s))
                    }
                }
                other => format!("[{}]", self.render(other, depth + 1)?),
            };
            keyed.push((key, self.render(&v, depth + 1)?));
        }
        keyed.sort();
        parts.extend(keyed.into_iter().map(|(k, v)| format!("{k} = {v}")));
        Ok(parts)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else { return false };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !LUA_KEYWORDS.contains(&s)
}

/// Double-quote `s`, escaping quotes, backslashes and control characters.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Always three digits, or a following digit would join the escape.
            c if c.is_ascii_control() => out.push_str(&format!("\\{:03}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
