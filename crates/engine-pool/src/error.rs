//! Error taxonomy for the engine pool and the analysis coordinator.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while supervising engines or running an analysis.
#[derive(Error, Debug)]
pub enum PoolError {
    /// No engine binary is configured, or spawning/handshaking failed.
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),
    /// No idle engine became available within the acquire timeout.
    #[error("No engine became available within {0:?}")]
    PoolExhausted(Duration),
    /// Engine output did not match the expected command/response framing.
    #[error("Protocol error: {0}")]
    ProtocolError(String),
    /// The engine did not answer within its budget.
    #[error("Engine did not answer within {0:?}")]
    Timeout(Duration),
    /// The request was rejected before reaching an engine.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Reading from or writing to the engine's pipes failed.
    #[error("Engine I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<uci::UciError> for PoolError {
    fn from(err: uci::UciError) -> Self {
        match err {
            uci::UciError::IoError(e) => PoolError::Io(e),
            uci::UciError::ParseError(msg) => PoolError::ProtocolError(msg),
        }
    }
}
