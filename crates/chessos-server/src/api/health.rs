//! Liveness endpoint.

use axum::Json;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Report that the server process is up.
///
/// # Endpoint
///
/// `GET /api/v1/health`
///
/// # Response
///
/// - `200 OK`: `{"status":"ok","service":"chessos","version":"..."}`
///
/// Engine availability is reported separately by the play-bot status endpoint,
/// so this stays `ok` even when no engine is configured.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "chessos",
        version: env!("CARGO_PKG_VERSION"),
    })
}
