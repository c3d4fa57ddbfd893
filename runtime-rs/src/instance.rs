//! A live interpreter instance and the capability surface the engine uses.
//!
//! An [`Instance`] owns one Lua state plus an explicit *error slot*: every
//! protected call that fails stores what was raised in the slot instead of
//! returning it, and the engine/renderer query and clear the slot between
//! steps.  The slot must be empty whenever the instance is handed to a new
//! request.
//!
//! [`CompileContext`] is the per-request compilation resource.  It is
//! released by `Drop`, so every exit path of a request gives it back.

use std::cell::{Cell, RefCell};

use mlua::prelude::*;
use mlua::{ChunkMode, StdLib};

use crate::config::{RuntimeConfig, StdlibSet};
use crate::inspect;

// ── Raised ────────────────────────────────────────────────────────────────────

/// Contents of the error slot.
#[derive(Debug)]
pub enum Raised {
    /// A value thrown by script code with `error(...)`.
    Value(LuaValue),
    /// An error produced by the binding itself (syntax, memory, callback).
    Host(LuaError),
}

impl Raised {
    fn from_value(value: LuaValue) -> Self {
        match value {
            LuaValue::Error(err) => Raised::Host(*err),
            other => Raised::Value(other),
        }
    }
}

/// Drop a leading `#` line, keeping its newline so line numbers hold.
pub(crate) fn skip_shebang(source: &str) -> &str {
    if source.starts_with('#') {
        source.find('\n').map_or("", |i| &source[i..])
    } else {
        source
    }
}

/// Strip the callback wrapper mlua puts around errors returned from Rust.
fn root_cause(err: &LuaError) -> &LuaError {
    match err {
        LuaError::CallbackError { cause, .. } => root_cause(cause),
        other => other,
    }
}

// ── Instance ──────────────────────────────────────────────────────────────────

pub struct Instance {
    lua: Lua,
    pcall: LuaFunction,
    tostring: LuaFunction,
    inspect: LuaFunction,
    error: RefCell<Option<Raised>>,
    live_contexts: Cell<usize>,
}

impl Instance {
    /// Open a fresh Lua state, install `inspect`, and run the preloads.
    ///
    /// A preload failure discards the half-built state.
    pub fn open(config: &RuntimeConfig) -> LuaResult<Self> {
        let lua = match config.stdlib {
            // SAFETY: `debug` is requested explicitly through configuration.
            StdlibSet::All => unsafe { Lua::unsafe_new_with(StdLib::ALL, LuaOptions::new()) },
            StdlibSet::Safe => Lua::new_with(StdLib::ALL_SAFE, LuaOptions::new())?,
        };

        let globals = lua.globals();
        let pcall: LuaFunction = globals.get("pcall")?;
        let tostring: LuaFunction = globals.get("tostring")?;
        let inspect = inspect::install(&lua, config.inspect_depth)?;

        for path in &config.preload {
            let source = std::fs::read_to_string(path).map_err(LuaError::external)?;
            lua.load(skip_shebang(&source))
                .set_name(format!("@{}", path.display()))
                .set_mode(ChunkMode::Text)
                .exec()?;
        }

        Ok(Self {
            lua,
            pcall,
            tostring,
            inspect,
            error: RefCell::new(None),
            live_contexts: Cell::new(0),
        })
    }

    pub(crate) fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Number of compile contexts not yet released.
    pub fn live_contexts(&self) -> usize {
        self.live_contexts.get()
    }

    // ── Error slot ────────────────────────────────────────────────────────────

    pub fn error_pending(&self) -> bool {
        self.error.borrow().is_some()
    }

    pub(crate) fn raise(&self, raised: Raised) {
        *self.error.borrow_mut() = Some(raised);
    }

    pub fn take_error(&self) -> Option<Raised> {
        self.error.borrow_mut().take()
    }

    pub(crate) fn clear_error(&self) {
        self.error.borrow_mut().take();
    }

    /// Whether the pending error is a compile error at end of input, i.e.
    /// more source text could still complete the chunk.
    pub fn incomplete_input(&self) -> bool {
        match self.error.borrow().as_ref() {
            Some(Raised::Host(err)) => matches!(
                root_cause(err),
                LuaError::SyntaxError { incomplete_input: true, .. }
            ),
            _ => false,
        }
    }

    // ── Calls ─────────────────────────────────────────────────────────────────

    /// Call `func(arg)` through the interpreter's own `pcall`.
    ///
    /// On failure the raised value goes to the error slot and `None` is
    /// returned.  The saved `pcall` keeps the raised object intact, which a
    /// direct call from Rust would flatten to a string.
    pub fn protected_call(&self, func: &LuaFunction, arg: LuaValue) -> Option<LuaMultiValue> {
        match self.pcall.call::<LuaMultiValue>((func.clone(), arg)) {
            Err(err) => {
                self.raise(Raised::Host(err));
                None
            }
            Ok(mut values) => {
                let ok = matches!(values.pop_front(), Some(LuaValue::Boolean(true)));
                if ok {
                    Some(values)
                } else {
                    let raised = values.pop_front().unwrap_or(LuaValue::Nil);
                    self.raise(Raised::from_value(raised));
                    None
                }
            }
        }
    }

    /// The interpreter's `tostring(value)`, or `None` if it raised.
    pub fn to_s(&self, value: LuaValue) -> Option<String> {
        let mut out = self.protected_call(&self.tostring, value)?;
        match out.pop_front() {
            Some(LuaValue::String(s)) => Some(s.to_string_lossy().to_string()),
            _ => Some(String::new()),
        }
    }

    /// The interpreter's `inspect(value)`.
    ///
    /// Returns `None` when the call raised (slot set) or produced no text.
    pub fn inspect(&self, value: LuaValue) -> Option<String> {
        let mut out = self.protected_call(&self.inspect, value)?;
        match out.pop_front() {
            Some(LuaValue::String(s)) => Some(s.to_string_lossy().to_string()),
            _ => None,
        }
    }

    // ── Error introspection ───────────────────────────────────────────────────

    /// Class/category label of a raised value, if it has one.
    ///
    /// Primitive error values are `RuntimeError`; tables use their
    /// metatable's `__name`; binding errors map to their kind.
    pub fn class_label(&self, raised: &Raised) -> Option<String> {
        match raised {
            Raised::Value(LuaValue::Table(t)) => t
                .metatable()
                .and_then(|mt| mt.raw_get::<Option<LuaString>>("__name").ok().flatten())
                .map(|name| name.to_string_lossy().to_string()),
            Raised::Value(
                LuaValue::Nil
                | LuaValue::Boolean(_)
                | LuaValue::Integer(_)
                | LuaValue::Number(_)
                | LuaValue::String(_),
            ) => Some("RuntimeError".to_owned()),
            Raised::Value(_) => None,
            Raised::Host(err) => Some(
                match root_cause(err) {
                    LuaError::SyntaxError { .. } => "SyntaxError",
                    LuaError::RuntimeError(_) => "RuntimeError",
                    LuaError::MemoryError(_) => "MemoryError",
                    _ => "Error",
                }
                .to_owned(),
            ),
        }
    }

    /// Message text of a raised value.
    ///
    /// Strings and binding errors are read directly.  Anything else goes
    /// through `tostring`, which may raise; in that case the slot is set
    /// again and `None` is returned.
    pub fn error_message(&self, raised: &Raised) -> Option<String> {
        match raised {
            Raised::Value(LuaValue::String(s)) => Some(s.to_string_lossy().to_string()),
            Raised::Value(other) => self.to_s(other.clone()),
            Raised::Host(err) => Some(match root_cause(err) {
                LuaError::SyntaxError { message, .. }
                | LuaError::RuntimeError(message)
                | LuaError::MemoryError(message) => message.clone(),
                other => other.to_string(),
            }),
        }
    }
}

// ── CompileContext ────────────────────────────────────────────────────────────

/// Scratch compilation state for one request.
///
/// Holds a registry record naming the chunk being compiled.  Dropping the
/// context removes the record and decrements the instance's live count.
pub struct CompileContext<'a> {
    instance: &'a Instance,
    chunk_name: String,
    record: Option<LuaRegistryKey>,
}

impl<'a> CompileContext<'a> {
    pub fn acquire(instance: &'a Instance, chunk_name: &str) -> LuaResult<Self> {
        let lua = instance.lua();
        let record = lua.create_table()?;
        record.set("chunk", chunk_name)?;
        let key = lua.create_registry_value(record)?;
        instance.live_contexts.set(instance.live_contexts.get() + 1);
        Ok(Self {
            instance,
            chunk_name: chunk_name.to_owned(),
            record: Some(key),
        })
    }

    /// Compile `source` into a callable chunk.
    ///
    /// The source is first tried as an expression (`return <source>`) so
    /// that `1 + 1` yields a value; on failure it is compiled as a block,
    /// and that compile error is the one placed in the slot.
    pub fn compile(&self, source: &str) -> Option<LuaFunction> {
        let lua = self.instance.lua();
        let as_expr = format!("return {source}");
        let compiled = lua
            .load(as_expr.as_str())
            .set_name(self.chunk_name.as_str())
            .set_mode(ChunkMode::Text)
            .into_function()
            .or_else(|_| {
                lua.load(source)
                    .set_name(self.chunk_name.as_str())
                    .set_mode(ChunkMode::Text)
                    .into_function()
            });
        match compiled {
            Ok(func) => Some(func),
            Err(err) => {
                self.instance.raise(Raised::Host(err));
                None
            }
        }
    }
}

impl Drop for CompileContext<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.record.take() {
            // Only fails for a key from another state, which cannot happen here.
            let _ = self.instance.lua().remove_registry_value(key);
        }
        self.instance
            .live_contexts
            .set(self.instance.live_contexts.get() - 1);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
