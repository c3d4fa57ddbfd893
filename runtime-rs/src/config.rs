//! Runtime configuration.
//!
//! Layering, lowest priority first:
//!
//! | Source                                             | Notes                      |
//! |----------------------------------------------------|----------------------------|
//! | built-in defaults                                  | [`RuntimeConfig::default`] |
//! | `--config <file>` / `$LUA_RUNTIME_CONFIG`          | must exist when named      |
//! | `<user config dir>/lua-runtime/config.toml`        | used only if present       |
//! | `$LUA_RUNTIME_CHUNK_NAME`, `$LUA_RUNTIME_INSPECT_DEPTH`, `$LUA_RUNTIME_LOG` | per-field overrides |
//!
//! Example file:
//! ```toml
//! chunk_name = "(eval)"
//! stdlib = "safe"
//! preload = ["/usr/share/lua-runtime/prelude.lua"]
//! inspect_depth = 8
//! log_level = "warn"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const ENV_CONFIG: &str = "LUA_RUNTIME_CONFIG";
pub const ENV_CHUNK_NAME: &str = "LUA_RUNTIME_CHUNK_NAME";
pub const ENV_INSPECT_DEPTH: &str = "LUA_RUNTIME_INSPECT_DEPTH";
pub const ENV_LOG: &str = "LUA_RUNTIME_LOG";

// ── Errors ────────────────────────────────────────────────────────────────────

/// A configuration source could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("${var}: {reason}")]
    Env { var: &'static str, reason: String },
}

// ── Types ─────────────────────────────────────────────────────────────────────

/// Which Lua standard libraries a fresh instance opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdlibSet {
    /// Everything, including `debug`.
    All,
    /// Everything except `debug`.
    #[default]
    Safe,
}

/// Settings that shape every interpreter instance the runtime creates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Chunk name used in error positions for string evaluation.
    pub chunk_name: String,
    pub stdlib: StdlibSet,
    /// Scripts run, in order, on every freshly created instance.
    pub preload: Vec<PathBuf>,
    /// Table nesting rendered by `inspect` before eliding with `{...}`.
    pub inspect_depth: usize,
    /// Default tracing filter used by the CLI when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            chunk_name: "(eval)".to_owned(),
            stdlib: StdlibSet::default(),
            preload: Vec::new(),
            inspect_depth: 8,
            log_level: "warn".to_owned(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl RuntimeConfig {
    /// Parse a TOML document.  Missing keys keep their defaults.
    pub fn load_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Read and parse a TOML config file.
    ///
    /// Relative `preload` entries are resolved against the file's directory.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let mut config = Self::load_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        if let Some(base) = path.parent() {
            for entry in &mut config.preload {
                if entry.is_relative() {
                    *entry = base.join(&*entry);
                }
            }
        }
        Ok(config)
    }

    /// Apply per-field overrides.  `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup(ENV_CHUNK_NAME).filter(|s| !s.is_empty()) {
            self.chunk_name = name;
        }
        if let Some(depth) = lookup(ENV_INSPECT_DEPTH) {
            self.inspect_depth = depth.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_INSPECT_DEPTH,
                reason: format!("not a non-negative integer: {depth:?}"),
            })?;
        }
        if let Some(level) = lookup(ENV_LOG).filter(|s| !s.is_empty()) {
            self.log_level = level;
        }
        Ok(())
    }

    /// Build the effective configuration from every layer.
    ///
    /// `explicit` is the `--config` CLI argument.  A named file (CLI or
    /// `$LUA_RUNTIME_CONFIG`) must exist; the per-user file is optional.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let named = explicit
            .map(Path::to_owned)
            .or_else(|| std::env::var_os(ENV_CONFIG).map(PathBuf::from));

        let mut config = match named {
            Some(path) => Self::load_file(&path)?,
            None => match default_path().filter(|p| p.exists()) {
                Some(path) => Self::load_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }
}

/// Per-user config file location (`~/.config/lua-runtime/config.toml` on
/// Linux).
pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "lua-runtime")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let c = RuntimeConfig::default();
        assert_eq!(c.chunk_name, "(eval)");
        assert_eq!(c.stdlib, StdlibSet::Safe);
        assert!(c.preload.is_empty());
        assert_eq!(c.inspect_depth, 8);
        assert_eq!(c.log_level, "warn");
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(RuntimeConfig::load_str("").unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let c = RuntimeConfig::load_str("stdlib = \"all\"\ninspect_depth = 2\n").unwrap();
        assert_eq!(c.stdlib, StdlibSet::All);
        assert_eq!(c.inspect_depth, 2);
        assert_eq!(c.chunk_name, "(eval)");
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(RuntimeConfig::load_str("sandbox = true").is_err());
    }

    #[test]
    fn unknown_stdlib_rejected() {
        assert!(RuntimeConfig::load_str("stdlib = \"minimal\"").is_err());
    }

    #[test]
    fn load_file_resolves_relative_preload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "preload = [\"prelude.lua\", \"/abs/other.lua\"]").unwrap();

        let c = RuntimeConfig::load_file(&path).unwrap();
        assert_eq!(c.preload[0], dir.path().join("prelude.lua"));
        assert_eq!(c.preload[1], PathBuf::from("/abs/other.lua"));
    }

    #[test]
    fn load_file_missing_names_path() {
        let err = RuntimeConfig::load_file(Path::new("/no/such/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/no/such/config.toml"));
    }

    #[test]
    fn load_file_malformed_names_path() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "inspect_depth = \"deep\"").unwrap();
        let err = RuntimeConfig::load_file(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&f.path().display().to_string()));
    }

    #[test]
    fn env_overrides() {
        let mut c = RuntimeConfig::default();
        c.apply_env(env(&[
            (ENV_CHUNK_NAME, "repl"),
            (ENV_INSPECT_DEPTH, "3"),
            (ENV_LOG, "debug"),
        ]))
        .unwrap();
        assert_eq!(c.chunk_name, "repl");
        assert_eq!(c.inspect_depth, 3);
        assert_eq!(c.log_level, "debug");
    }

    #[test]
    fn env_empty_values_ignored() {
        let mut c = RuntimeConfig::default();
        c.apply_env(env(&[(ENV_CHUNK_NAME, ""), (ENV_LOG, "")])).unwrap();
        assert_eq!(c, RuntimeConfig::default());
    }

    #[test]
    fn env_bad_depth_is_error() {
        let mut c = RuntimeConfig::default();
        let err = c.apply_env(env(&[(ENV_INSPECT_DEPTH, "-1")])).unwrap_err();
        assert!(err.to_string().contains(ENV_INSPECT_DEPTH));
    }
}
