//! API handlers for the chessOS server.

pub mod health;
pub mod play_bot;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use engine_pool::PoolError;
use serde::Serialize;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error kind.
    pub error: &'static str,
    /// Human-readable detail.
    pub message: String,
}

/// A request that failed before reaching an engine.
#[derive(Debug)]
pub struct ApiError(pub PoolError);

impl From<PoolError> for ApiError {
    fn from(err: PoolError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            PoolError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            PoolError::EngineUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "engine_unavailable")
            }
            PoolError::PoolExhausted(_) => (StatusCode::SERVICE_UNAVAILABLE, "pool_exhausted"),
            PoolError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            PoolError::ProtocolError(_) | PoolError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "engine_error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let body = Json(ErrorBody {
            error: kind,
            message: self.0.to_string(),
        });
        match &self.0 {
            PoolError::PoolExhausted(waited) => {
                let retry_after = waited.as_secs().max(1).to_string();
                (status, [(header::RETRY_AFTER, retry_after)], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}
