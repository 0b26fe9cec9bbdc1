//! Request timing middleware.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::{Duration, Instant};

/// Requests slower than this are logged at `warn`.
///
/// Analysis requests routinely spend a second or more in the engine, so the
/// bar sits above a typical search budget.
pub const SLOW_REQUEST: Duration = Duration::from_millis(2_000);

/// Log method, path, status and duration of every request.
///
/// ```ignore
/// let app = Router::new()
///     .route("/api/v1/health", get(health))
///     .layer(axum::middleware::from_fn(timing_layer));
/// ```
pub async fn timing_layer(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    if elapsed > SLOW_REQUEST {
        tracing::warn!(%method, %path, status, duration_ms = elapsed.as_millis() as u64, "slow request");
    } else {
        tracing::debug!(%method, %path, status, duration_ms = elapsed.as_millis() as u64, "request completed");
    }

    response
}
