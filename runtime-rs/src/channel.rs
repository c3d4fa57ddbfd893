//! Named method-call dispatch for hosts that talk over a message channel.
//!
//! | Method    | Arguments             | Reply                        |
//! |-----------|-----------------------|------------------------------|
//! | `eval`    | `{"code": "<src>"}`   | `success` with display text  |
//! | `runFile` | `{"path": "<file>"}`  | `success` with display text  |
//! | `reset`   | none                  | `success` with no value      |
//! | other     |                       | `not_implemented`            |
//!
//! Calls and replies serialise as JSON objects, one per line when spoken
//! over stdio (see `lua-runtime -j`).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::RuntimeError;
use crate::runtime::Runtime;

pub const INVALID_ARGS: &str = "invalid_args";
pub const INVALID_CALL: &str = "invalid_call";
pub const SCRIPT_ERROR: &str = "script_error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: JsonValue,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// A non-blank string argument, if present.
    fn string_arg(&self, name: &str) -> Option<&str> {
        self.arguments
            .get(name)
            .and_then(JsonValue::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    Success { value: Option<String> },
    Error { code: String, message: String },
    NotImplemented,
}

impl Reply {
    fn error(code: &str, message: impl Into<String>) -> Self {
        Reply::Error {
            code: code.to_owned(),
            message: message.into(),
        }
    }
}

impl From<Result<String, RuntimeError>> for Reply {
    fn from(result: Result<String, RuntimeError>) -> Self {
        match result {
            Ok(value) => Reply::Success { value: Some(value) },
            Err(RuntimeError::InvalidArgument(message)) => Reply::error(INVALID_ARGS, message),
            Err(err) => Reply::error(SCRIPT_ERROR, err.to_string()),
        }
    }
}

/// Routes method calls to a [`Runtime`].
pub struct Dispatcher<'a> {
    runtime: &'a Runtime,
}

impl<'a> Dispatcher<'a> {
    pub fn new(runtime: &'a Runtime) -> Self {
        Self { runtime }
    }

    pub fn handle(&self, call: &MethodCall) -> Reply {
        tracing::debug!(method = %call.method, "method call");
        match call.method.as_str() {
            "eval" => match call.string_arg("code") {
                Some(code) => self.runtime.eval(code).into(),
                None => Reply::error(INVALID_ARGS, "Missing 'code' argument."),
            },
            "runFile" => match call.string_arg("path") {
                Some(path) => self.runtime.eval_file(path).into(),
                None => Reply::error(INVALID_ARGS, "Missing 'path' argument."),
            },
            "reset" => {
                self.runtime.reset();
                Reply::Success { value: None }
            }
            _ => Reply::NotImplemented,
        }
    }

    /// Decode one JSON call, dispatch it, and encode the reply.
    pub fn handle_line(&self, line: &str) -> String {
        let reply = match serde_json::from_str::<MethodCall>(line) {
            Ok(call) => self.handle(&call),
            Err(err) => Reply::error(INVALID_CALL, format!("malformed method call: {err}")),
        };
        serde_json::to_string(&reply).unwrap_or_else(|err| encode_failure(&err))
    }
}

fn encode_failure(err: &dyn std::fmt::Display) -> String {
    serde_json::json!({
        "status": "error",
        "code": INVALID_CALL,
        "message": format!("unable to encode reply: {err}"),
    })
    .to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
