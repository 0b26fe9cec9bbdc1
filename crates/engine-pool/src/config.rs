//! Engine pool configuration.
//!
//! Built once at startup and handed to [`EnginePool::start`](crate::EnginePool::start);
//! it is never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for the engine subprocesses and the pool that owns them.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine executable. `None` leaves the pool unavailable without spawning.
    pub path: Option<PathBuf>,
    /// Extra command-line arguments passed to the engine.
    pub args: Vec<String>,
    /// Number of engine subprocesses kept alive.
    pub pool_size: usize,
    /// UCI options sent with `setoption` after the handshake.
    pub options: BTreeMap<String, String>,
    /// How long `acquire` waits for an idle engine.
    pub acquire_timeout_ms: u64,
    /// How long spawn + `uci`/`isready` may take.
    pub handshake_timeout_ms: u64,
    /// Upper bound on a depth-limited search.
    pub depth_timeout_ms: u64,
    /// Slack added on top of a movetime budget before the request times out.
    pub movetime_grace_ms: u64,
    /// Interval between liveness checks of idle engines.
    pub health_check_interval_ms: u64,
    /// Depth used when a request names no budget.
    pub default_depth: u32,
    /// Largest accepted depth budget.
    pub max_depth: u32,
    /// Largest accepted movetime budget.
    pub max_movetime_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: None,
            args: Vec::new(),
            pool_size: 2,
            options: BTreeMap::new(),
            acquire_timeout_ms: 5_000,
            handshake_timeout_ms: 10_000,
            depth_timeout_ms: 30_000,
            movetime_grace_ms: 1_000,
            health_check_interval_ms: 5_000,
            default_depth: 20,
            max_depth: 40,
            max_movetime_ms: 60_000,
        }
    }
}

impl EngineConfig {
    /// Default configuration pointing at `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// True when an engine binary location is set.
    pub fn is_configured(&self) -> bool {
        self.path
            .as_ref()
            .is_some_and(|p| !p.as_os_str().is_empty())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn depth_timeout(&self) -> Duration {
        Duration::from_millis(self.depth_timeout_ms)
    }

    pub fn movetime_grace(&self) -> Duration {
        Duration::from_millis(self.movetime_grace_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms.max(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unconfigured() {
        let config = EngineConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.default_depth, 20);
    }

    #[test]
    fn test_empty_path_is_unconfigured() {
        let config = EngineConfig::with_path("");
        assert!(!config.is_configured());
    }

    #[test]
    fn test_with_path() {
        let config = EngineConfig::with_path("/usr/bin/stockfish");
        assert!(config.is_configured());
        assert_eq!(config.acquire_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_deserialize_partial_uses_defaults() {
        let json = r#"{"path": "/opt/stockfish", "pool_size": 4, "options": {"Hash": "64"}}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.path, Some(PathBuf::from("/opt/stockfish")));
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.options.get("Hash").map(String::as_str), Some("64"));
        assert_eq!(config.handshake_timeout_ms, 10_000);
    }

    #[test]
    fn test_health_check_interval_has_floor() {
        let config = EngineConfig {
            health_check_interval_ms: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.health_check_interval(), Duration::from_millis(10));
    }
}
