//! Compile and run one unit of source text against an instance.

use mlua::prelude::*;

use crate::instance::{CompileContext, Instance};
use crate::render;

pub const COMPILE_CONTEXT_FAILED: &str = "failed to create compile context";

/// Result of one execution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
    /// A compile failure at end of input: the source is an unfinished chunk.
    Incomplete(String),
}

/// Run `source` and render the outcome.
///
/// The compile context lives only for the compile-and-call step.  The error
/// slot is checked after the call and again after describing the result,
/// since `inspect` runs metamethods that can raise.
pub fn run(instance: &Instance, source: &str, chunk_name: &str) -> Outcome {
    debug_assert!(!instance.error_pending(), "error slot not cleared by previous request");

    let returned = {
        let context = match CompileContext::acquire(instance, chunk_name) {
            Ok(context) => context,
            Err(err) => {
                tracing::warn!(error = %err, "compile context unavailable");
                return Outcome::Failure(COMPILE_CONTEXT_FAILED.to_owned());
            }
        };
        context
            .compile(source)
            .and_then(|func| instance.protected_call(&func, LuaValue::Nil))
    };

    if instance.error_pending() {
        let incomplete = instance.incomplete_input();
        let message = render::render_error(Some(instance));
        return if incomplete {
            Outcome::Incomplete(message)
        } else {
            Outcome::Failure(message)
        };
    }

    let value = returned
        .and_then(|mut values| values.pop_front())
        .unwrap_or(LuaValue::Nil);
    let display = render::display_value(instance, value);

    if instance.error_pending() {
        return Outcome::Failure(render::render_error(Some(instance)));
    }

    Outcome::Success(display.unwrap_or_default())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
