//! The gate and the three host-facing operations.
//!
//! | Operation               | Method                 |
//! |-------------------------|------------------------|
//! | evaluate source text    | [`Runtime::eval`]      |
//! | evaluate a source file  | [`Runtime::eval_file`] |
//! | discard all state       | [`Runtime::reset`]     |
//!
//! Every operation takes the same exclusive lock for its whole duration, so
//! calls from many threads are fully serialised.  There is no timeout: a
//! script that never finishes holds the gate forever.

use std::path::Path;
use std::sync::OnceLock;

use parking_lot::{Mutex, MutexGuard};

use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::instance::{self, Instance};
use crate::lifecycle::Lifecycle;

pub struct Runtime {
    gate: Mutex<Lifecycle>,
}

static SHARED: OnceLock<Runtime> = OnceLock::new();

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            gate: Mutex::new(Lifecycle::new(config)),
        }
    }

    /// Process-wide runtime with the default configuration, created on
    /// first use.
    pub fn shared() -> &'static Runtime {
        SHARED.get_or_init(|| Runtime::new(RuntimeConfig::default()))
    }

    /// Evaluate `code` and return its display text.
    pub fn eval(&self, code: &str) -> Result<String> {
        let mut lifecycle = self.gate.lock();
        let chunk_name = format!("={}", lifecycle.config().chunk_name);
        lifecycle.execute(code, &chunk_name)
    }

    /// Read `path` and evaluate its contents.
    ///
    /// The file is read before the gate is taken.  An empty file is
    /// rejected the same way as an unreadable one, with its own reason.
    /// A leading `#` line (`#!/usr/bin/env lua`) is ignored.
    pub fn eval_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(RuntimeError::InvalidArgument("path argument is empty".to_owned()));
        }
        let source = read_source(path)?;
        let chunk_name = format!("@{}", path.display());
        self.gate
            .lock()
            .execute(instance::skip_shebang(&source), &chunk_name)
    }

    /// Destroy the interpreter instance.  The next evaluation starts fresh.
    pub fn reset(&self) {
        self.gate.lock().reset();
    }

    /// Whether the live instance still holds a raised error.  Always false
    /// between operations.
    pub fn error_pending(&self) -> bool {
        self.gate.lock().instance().is_some_and(Instance::error_pending)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.gate.lock()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

fn read_source(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(source) if source.is_empty() => Err(RuntimeError::ReadFile {
            path: path.to_owned(),
            reason: "file is empty".to_owned(),
        }),
        Ok(source) => Ok(source),
        Err(err) => Err(RuntimeError::ReadFile {
            path: path.to_owned(),
            reason: err.to_string(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn eval_returns_display_text() {
        let rt = Runtime::default();
        assert_eq!(rt.eval("'text'").unwrap(), "text");
        assert_eq!(rt.eval("6 * 7").unwrap(), "42");
    }

    #[test]
    fn eval_file_runs_contents() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "from_file = 'yes'").unwrap();
        writeln!(f, "return from_file").unwrap();
        let rt = Runtime::default();
        assert_eq!(rt.eval_file(f.path()).unwrap(), "yes");
        assert_eq!(rt.eval("from_file").unwrap(), "yes");
    }

    #[test]
    fn eval_file_error_position_names_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "error('in file')").unwrap();
        let rt = Runtime::default();
        let err = rt.eval_file(f.path()).unwrap_err().to_string();
        assert!(err.contains("in file"), "{err}");
    }

    #[test]
    fn missing_file_does_not_open_instance() {
        let rt = Runtime::default();
        let err = rt.eval_file("/no/such/script.lua").unwrap_err();
        assert!(err.to_string().contains("/no/such/script.lua"));
        assert!(!rt.lock().is_open());
    }

    #[test]
    fn shebang_line_skipped() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "#!/usr/bin/env lua").unwrap();
        writeln!(f, "return 1 + 1").unwrap();
        let rt = Runtime::default();
        assert_eq!(rt.eval_file(f.path()).unwrap(), "2");
    }

    #[test]
    fn shebang_keeps_line_numbers() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "#!/usr/bin/env lua").unwrap();
        writeln!(f, "local t; return t.x").unwrap();
        let rt = Runtime::default();
        let err = rt.eval_file(f.path()).unwrap_err().to_string();
        assert!(err.contains(":2:"), "{err}");
    }

    #[test]
    fn hash_in_eval_is_length_operator() {
        let rt = Runtime::default();
        assert_eq!(rt.eval("#'abc'").unwrap(), "3");
    }

    #[test]
    fn empty_file_rejected() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let rt = Runtime::default();
        let err = rt.eval_file(f.path()).unwrap_err();
        assert!(matches!(&err, RuntimeError::ReadFile { reason, .. } if reason == "file is empty"));
    }

    #[test]
    fn empty_path_is_invalid_argument() {
        let rt = Runtime::default();
        assert!(matches!(rt.eval_file(""), Err(RuntimeError::InvalidArgument(_))));
    }

    #[test]
    fn reset_drops_definitions() {
        let rt = Runtime::default();
        rt.eval("x = 1").unwrap();
        rt.reset();
        assert_eq!(rt.eval("x == nil").unwrap(), "true");
    }

    #[test]
    fn reset_releases_interpreter_state() {
        use std::sync::Arc;

        let rt = Runtime::default();
        let marker = Arc::new(());
        {
            let mut lifecycle = rt.lock();
            let lua = lifecycle.ensure().unwrap().lua();
            let held = Arc::clone(&marker);
            let hold_fn = lua.create_function(move |_, ()| Ok(Arc::strong_count(&held))).unwrap();
            lua.globals().set("held", hold_fn).unwrap();
        }
        assert_eq!(Arc::strong_count(&marker), 2);
        rt.reset();
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn error_pending_false_between_calls() {
        let rt = Runtime::default();
        assert!(!rt.error_pending());
        rt.eval("error('x')").unwrap_err();
        assert!(!rt.error_pending());
    }

    #[test]
    fn reset_is_always_safe() {
        let rt = Runtime::default();
        rt.reset();
        rt.reset();
        assert_eq!(rt.eval("1").unwrap(), "1");
    }

    #[test]
    fn configured_chunk_name_used() {
        let rt = Runtime::new(RuntimeConfig {
            chunk_name: "console".to_owned(),
            ..RuntimeConfig::default()
        });
        let err = rt.eval("local t; return t.x").unwrap_err().to_string();
        assert!(err.contains("console:1:"), "{err}");
    }

    #[test]
    fn shared_runtime_is_single() {
        let a = Runtime::shared() as *const Runtime;
        let b = Runtime::shared() as *const Runtime;
        assert_eq!(a, b);
    }
}
