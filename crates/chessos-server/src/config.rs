//! Server settings.
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables. They are loaded once in `main` and passed down;
//! nothing reads the environment after start-up.
//!
//! ```toml
//! bind = "127.0.0.1:8000"
//!
//! [engine]
//! path = "/usr/bin/stockfish"
//! pool_size = 4
//!
//! [engine.options]
//! Threads = "1"
//! ```

use engine_pool::EngineConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Engine binary location.
pub const ENV_STOCKFISH_PATH: &str = "STOCKFISH_PATH";
/// Number of engine processes.
pub const ENV_POOL_SIZE: &str = "ENGINE_POOL_SIZE";
/// Listen address.
pub const ENV_BIND: &str = "CHESSOS_BIND";

/// Errors that can occur when loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the settings file from disk.
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse the settings file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// An environment variable held a value of the wrong shape.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

/// Top-level server settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    /// Address the HTTP server listens on.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Engine pool settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            engine: EngineConfig::default(),
        }
    }
}

impl Settings {
    /// Default settings file, looked up in the working directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from("chessos.toml")
    }

    /// Load settings from `path` (or the default file if present), then
    /// apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if an explicitly given file cannot be
    /// read, [`ConfigError::ParseError`] for invalid TOML, and
    /// [`ConfigError::InvalidEnv`] for malformed environment values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Parse a TOML settings file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    ///
    /// An empty `STOCKFISH_PATH` clears the engine path.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = lookup(ENV_STOCKFISH_PATH) {
            let path = path.trim();
            self.engine.path = if path.is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        if let Some(size) = lookup(ENV_POOL_SIZE) {
            self.engine.pool_size = size
                .trim()
                .parse()
                .ok()
                .filter(|n: &usize| *n > 0)
                .ok_or(ConfigError::InvalidEnv {
                    name: ENV_POOL_SIZE,
                    value: size,
                })?;
        }
        if let Some(bind) = lookup(ENV_BIND) {
            self.bind = bind.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_BIND,
                value: bind.clone(),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.bind.port(), 8000);
        assert!(!settings.engine.is_configured());
    }

    #[test]
    fn test_env_sets_engine_path_and_pool_size() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                (ENV_STOCKFISH_PATH, "/usr/games/stockfish"),
                (ENV_POOL_SIZE, "4"),
                (ENV_BIND, "0.0.0.0:9000"),
            ]))
            .unwrap();

        assert_eq!(
            settings.engine.path,
            Some(PathBuf::from("/usr/games/stockfish"))
        );
        assert_eq!(settings.engine.pool_size, 4);
        assert_eq!(settings.bind, "0.0.0.0:9000".parse().unwrap());
    }

    #[test]
    fn test_empty_env_path_clears_engine() {
        let mut settings = Settings::default();
        settings.engine.path = Some(PathBuf::from("/from/file"));
        settings.apply_env(env(&[(ENV_STOCKFISH_PATH, "  ")])).unwrap();
        assert_eq!(settings.engine.path, None);
    }

    #[test]
    fn test_invalid_pool_size_is_rejected() {
        for bad in ["zero", "0", "-1"] {
            let mut settings = Settings::default();
            let err = settings.apply_env(env(&[(ENV_POOL_SIZE, bad)])).unwrap_err();
            assert!(err.to_string().contains(ENV_POOL_SIZE));
        }
    }

    #[test]
    fn test_invalid_bind_is_rejected() {
        let mut settings = Settings::default();
        let err = settings.apply_env(env(&[(ENV_BIND, "localhost")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: ENV_BIND, .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bind = "127.0.0.1:8123"

[engine]
path = "/opt/stockfish"
pool_size = 3
acquire_timeout_ms = 250

[engine.options]
Hash = "32"
"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.bind.port(), 8123);
        assert_eq!(settings.engine.pool_size, 3);
        assert_eq!(settings.engine.acquire_timeout_ms, 250);
        assert_eq!(settings.engine.options.get("Hash").map(String::as_str), Some("32"));
        // Unset fields keep their defaults.
        assert_eq!(settings.engine.default_depth, 20);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Settings::from_file(Path::new("/nonexistent/chessos.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind = [").unwrap();
        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
