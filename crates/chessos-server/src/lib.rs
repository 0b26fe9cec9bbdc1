//! chessOS server library.
//!
//! Exposes the router so it can be driven in tests without binding a socket.

pub mod api;
pub mod config;
pub mod middleware;

use axum::routing::{get, post};
use axum::Router;
use engine_pool::{AnalysisCoordinator, EnginePool};
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Runs analyses against the engine pool.
    pub coordinator: AnalysisCoordinator,
}

impl AppState {
    pub fn new(pool: EnginePool) -> Self {
        Self {
            coordinator: AnalysisCoordinator::new(pool),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(api::health::health))
        .route("/api/v1/play-bot/status", get(api::play_bot::get_status))
        .route("/api/v1/play-bot/analysis", post(api::play_bot::post_analysis))
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::timing_layer))
        .layer(cors)
}
