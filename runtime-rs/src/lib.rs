//! Embedded Lua evaluation behind a single process-wide gate.
//!
//! One interpreter instance is created lazily, shared by every caller, and
//! accumulates state across calls until [`Runtime::reset`] discards it.
//! Results and errors come back as plain strings.
//!
//! ```no_run
//! use lua_runtime::Runtime;
//!
//! let rt = Runtime::default();
//! rt.eval("greeting = 'hello'").unwrap();
//! assert_eq!(rt.eval("greeting .. ' world'").unwrap(), "hello world");
//! assert_eq!(rt.eval("{1, 2}").unwrap(), "{1, 2}");
//! ```

pub mod channel;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod inspect;
pub mod instance;
pub mod lifecycle;
pub mod logging;
pub mod render;
pub mod runtime;

pub use config::RuntimeConfig;
pub use error::{Result, RuntimeError};
pub use runtime::Runtime;
