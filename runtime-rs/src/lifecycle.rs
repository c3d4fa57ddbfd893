//! Creation, lazy initialisation and teardown of the shared instance.
//!
//! A [`Lifecycle`] is only reachable through the gate in
//! [`crate::runtime::Runtime`]; holding `&mut Lifecycle` is the proof that
//! the caller owns the lock.

use std::time::Instant;

use crate::config::RuntimeConfig;
use crate::engine::{self, Outcome};
use crate::error::{Result, RuntimeError};
use crate::instance::Instance;

pub struct Lifecycle {
    config: RuntimeConfig,
    instance: Option<Instance>,
    generation: u64,
}

impl Lifecycle {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            instance: None,
            generation: 0,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Return the current instance, creating it first if absent.
    ///
    /// A construction failure is reported and nothing is stored; the next
    /// call tries again.
    pub fn ensure(&mut self) -> Result<&Instance> {
        if self.instance.is_none() {
            let instance = Instance::open(&self.config).map_err(|err| {
                tracing::warn!(error = %err, "interpreter construction failed");
                RuntimeError::Lifecycle(format!("failed to initialize interpreter: {err}"))
            })?;
            self.generation += 1;
            tracing::debug!(generation = self.generation, "interpreter instance created");
            self.instance = Some(instance);
        }
        self.instance
            .as_ref()
            .ok_or_else(|| RuntimeError::Lifecycle("interpreter instance missing".to_owned()))
    }

    /// Destroy the current instance, if any.  The next [`ensure`] builds a
    /// fresh one.
    ///
    /// [`ensure`]: Lifecycle::ensure
    pub fn reset(&mut self) {
        if self.instance.take().is_some() {
            tracing::debug!(generation = self.generation, "interpreter instance destroyed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.instance.is_some()
    }

    /// How many instances this lifecycle has created so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    /// Ensure an instance and run `source` on it.
    pub fn execute(&mut self, source: &str, chunk_name: &str) -> Result<String> {
        let started = Instant::now();
        let instance = self.ensure()?;
        let outcome = engine::run(instance, source, chunk_name);
        let elapsed = started.elapsed();
        match outcome {
            Outcome::Success(value) => {
                tracing::trace!(chunk = chunk_name, ?elapsed, "evaluation succeeded");
                Ok(value)
            }
            Outcome::Failure(message) => {
                tracing::debug!(chunk = chunk_name, ?elapsed, %message, "evaluation failed");
                if message == engine::COMPILE_CONTEXT_FAILED {
                    Err(RuntimeError::Lifecycle(message))
                } else {
                    Err(RuntimeError::Script(message))
                }
            }
            Outcome::Incomplete(message) => {
                tracing::debug!(chunk = chunk_name, ?elapsed, %message, "incomplete chunk");
                Err(RuntimeError::Incomplete(message))
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazy_creation() {
        let mut lc = Lifecycle::new(RuntimeConfig::default());
        assert!(!lc.is_open());
        lc.ensure().unwrap();
        assert!(lc.is_open());
        assert_eq!(lc.generation(), 1);
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut lc = Lifecycle::new(RuntimeConfig::default());
        lc.ensure().unwrap();
        lc.ensure().unwrap();
        assert_eq!(lc.generation(), 1);
    }

    #[test]
    fn reset_without_instance_is_noop() {
        let mut lc = Lifecycle::new(RuntimeConfig::default());
        lc.reset();
        assert!(!lc.is_open());
        assert_eq!(lc.generation(), 0);
    }

    #[test]
    fn reset_then_ensure_recreates() {
        let mut lc = Lifecycle::new(RuntimeConfig::default());
        lc.execute("kept = 1", "=t").unwrap();
        lc.reset();
        assert!(!lc.is_open());
        assert_eq!(lc.execute("kept", "=t").unwrap(), "nil");
        assert_eq!(lc.generation(), 2);
    }

    #[test]
    fn failed_construction_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let preload = dir.path().join("late.lua");
        let mut lc = Lifecycle::new(RuntimeConfig {
            preload: vec![preload.clone()],
            ..RuntimeConfig::default()
        });

        let err = lc.ensure().err().unwrap();
        assert!(matches!(err, RuntimeError::Lifecycle(_)));
        assert!(!lc.is_open());

        std::fs::write(&preload, "late = true").unwrap();
        assert_eq!(lc.execute("late", "=t").unwrap(), "true");
    }

    #[test]
    fn script_failure_maps_to_script_error() {
        let mut lc = Lifecycle::new(RuntimeConfig::default());
        let err = lc.execute("error('nope', 0)", "=t").unwrap_err();
        assert_eq!(err, RuntimeError::Script("RuntimeError: nope".to_owned()));
    }

    #[test]
    fn unfinished_chunk_maps_to_incomplete() {
        let mut lc = Lifecycle::new(RuntimeConfig::default());
        let err = lc.execute("local t = {", "=t").unwrap_err();
        assert!(err.is_incomplete(), "{err:?}");
        assert!(err.to_string().starts_with("SyntaxError: "), "{err}");
    }
}
