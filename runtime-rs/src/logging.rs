//! Tracing subscriber setup for the binary.
//!
//! Library code only emits events; installing a subscriber is left to the
//! host.  Output is compact `LEVEL message key=value` lines on stderr, so
//! results on stdout stay machine-readable.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (a level name or a
/// full filter directive) applies.  A second call is a no-op.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_ansi(false)
        .compact()
        .try_init();
}
