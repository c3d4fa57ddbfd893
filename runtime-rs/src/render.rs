//! Turning execution outcomes into display text.
//!
//! Nothing here returns an error.  A failure while rendering an error's own
//! message degrades to fixed fallback text after a single attempt, so a
//! raised object whose `__tostring` raises cannot recurse or leave the slot
//! set.

use mlua::prelude::*;

use crate::instance::Instance;

pub const UNKNOWN_ERROR: &str = "unknown interpreter error";
pub const RENDER_FAILED: &str = "<failed to render exception message>";
pub const NO_CLASS: &str = "Exception";
pub const NO_MESSAGE: &str = "<empty>";

/// Error rendering passes.  There is no transition out of `Fallback`.
enum Pass {
    Rendering,
    Fallback,
}

/// Render and clear the instance's pending error as `<Class>: <message>`.
///
/// Leaves the error slot empty on every path.
pub fn render_error(instance: Option<&Instance>) -> String {
    let Some(instance) = instance else {
        return UNKNOWN_ERROR.to_owned();
    };
    let Some(raised) = instance.take_error() else {
        return UNKNOWN_ERROR.to_owned();
    };

    let class = instance
        .class_label(&raised)
        .unwrap_or_else(|| NO_CLASS.to_owned());
    let message = instance.error_message(&raised);

    let pass = if instance.error_pending() {
        Pass::Fallback
    } else {
        Pass::Rendering
    };

    match pass {
        Pass::Rendering => {
            let message = message.unwrap_or_else(|| NO_MESSAGE.to_owned());
            format!("{class}: {message}")
        }
        Pass::Fallback => {
            instance.clear_error();
            format!("{class}: {RENDER_FAILED}")
        }
    }
}

/// Display text for a successful result.
///
/// Strings are used verbatim; anything else goes through `inspect`, which
/// may raise (the caller must check the slot afterwards).  `None` means no
/// usable text was produced.
///
/// Results are Rust strings, so a Lua string holding invalid UTF-8 is
/// converted lossily: each bad sequence becomes U+FFFD.
pub fn display_value(instance: &Instance, value: LuaValue) -> Option<String> {
    match value {
        LuaValue::String(s) => Some(s.to_string_lossy().to_string()),
        other => instance.inspect(other),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
