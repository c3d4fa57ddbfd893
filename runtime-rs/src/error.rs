//! Host-visible error type.
//!
//! Every failure the bridge can report is flattened into one of these
//! variants before it leaves the gate.  The `Display` text is the message a
//! host shows to its user; nothing else is carried across the boundary.

use std::path::PathBuf;

/// A failed boundary operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// A request argument was missing or unusable.  The interpreter was not
    /// touched.
    #[error("{0}")]
    InvalidArgument(String),

    /// The source file could not be turned into source text.  The
    /// interpreter was not invoked.
    #[error("unable to read file: {}: {reason}", .path.display())]
    ReadFile { path: PathBuf, reason: String },

    /// The interpreter instance or a compile context could not be created.
    #[error("{0}")]
    Lifecycle(String),

    /// The script raised.  Carries the rendered `<Class>: <message>` text.
    #[error("{0}")]
    Script(String),

    /// A script error raised because the source ended mid-chunk.  Appending
    /// more text may make it compile.
    #[error("{0}")]
    Incomplete(String),
}

impl RuntimeError {
    pub fn is_incomplete(&self) -> bool {
        matches!(self, RuntimeError::Incomplete(_))
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_file_message_names_path() {
        let err = RuntimeError::ReadFile {
            path: PathBuf::from("/tmp/missing.lua"),
            reason: "file is empty".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "unable to read file: /tmp/missing.lua: file is empty"
        );
    }

    #[test]
    fn script_message_is_verbatim() {
        let err = RuntimeError::Script("RuntimeError: (eval):1: x".to_owned());
        assert_eq!(err.to_string(), "RuntimeError: (eval):1: x");
    }
}
