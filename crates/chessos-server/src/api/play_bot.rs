//! Play-bot endpoints: engine pool status and position analysis.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use engine_pool::{AnalysisRequest, AnalysisResult, AnalysisStatus, PoolError, PoolStatus, SearchBudget};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::ApiError;
use crate::AppState;

/// Engine pool status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// `"ready"` or `"unavailable"`.
    pub status: &'static str,
    #[serde(flatten)]
    pub pool: PoolStatus,
}

/// Report whether the play-bot engine can serve requests.
///
/// # Endpoint
///
/// `GET /api/v1/play-bot/status`
///
/// # Response
///
/// - `200 OK`: pool snapshot with `ready`, `path`, `reason` and per-slot state
///
/// Always `200`; callers read `ready` rather than the HTTP status.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let pool = state.coordinator.pool().status();
    Json(StatusResponse {
        status: if pool.ready { "ready" } else { "unavailable" },
        pool,
    })
}

/// Analysis request body.
#[derive(Debug, Deserialize)]
pub struct AnalysisBody {
    /// `start`, `startpos`, or a FEN.
    pub position: String,
    /// UCI moves played from `position`.
    #[serde(default)]
    pub moves: Vec<String>,
    /// Fixed search depth. Mutually exclusive with `movetime_ms`.
    pub depth: Option<u32>,
    /// Fixed search time. Mutually exclusive with `depth`.
    pub movetime_ms: Option<u64>,
    /// Caller identifier for logs; defaults to the generated request id.
    pub requester: Option<String>,
}

impl AnalysisBody {
    fn budget(&self, default_depth: u32) -> Result<SearchBudget, PoolError> {
        match (self.depth, self.movetime_ms) {
            (Some(_), Some(_)) => Err(PoolError::InvalidRequest(
                "give either depth or movetime_ms, not both".to_string(),
            )),
            (Some(depth), None) => Ok(SearchBudget::Depth(depth)),
            (None, Some(ms)) => Ok(SearchBudget::MoveTime(Duration::from_millis(ms))),
            (None, None) => Ok(SearchBudget::Depth(default_depth)),
        }
    }
}

/// Analysis response.
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub request_id: String,
    pub requester: String,
    /// Best move in UCI notation.
    pub best_move: Option<String>,
    /// Evaluation in pawns (positive = White is better).
    pub evaluation: Option<f64>,
    /// Mate in N (positive = White mates).
    pub mate: Option<i32>,
    pub depth: Option<u32>,
    pub pv: Vec<String>,
    pub status: AnalysisStatus,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl AnalysisResponse {
    fn new(request_id: String, result: AnalysisResult) -> Self {
        Self {
            request_id,
            requester: result.requester,
            best_move: result.best_move,
            evaluation: result.evaluation,
            mate: result.mate,
            depth: result.depth,
            pv: result.pv,
            status: result.status,
            error: result.error,
            elapsed_ms: result.elapsed_ms,
        }
    }
}

/// Ask the engine for the best move and evaluation of a position.
///
/// # Endpoint
///
/// `POST /api/v1/play-bot/analysis`
///
/// # Request
///
/// `{"position": "startpos", "moves": ["e2e4"], "depth": 12}`. Without
/// `depth` or `movetime_ms` the configured default depth is used.
///
/// # Response
///
/// - `200 OK`: analysis result; `status` is `ok`, `timeout` or `engine_error`
/// - `400 Bad Request`: body that is not the JSON above, or a malformed
///   position, move list or budget
/// - `503 Service Unavailable`: no engine configured or started, or every
///   engine stayed busy past the acquire timeout (with `Retry-After`)
pub async fn post_analysis(
    State(state): State<AppState>,
    body: Result<Json<AnalysisBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body.map_err(|rejection| PoolError::InvalidRequest(rejection.body_text()))?;
    let request_id = Uuid::new_v4().to_string();
    let requester = body.requester.clone().unwrap_or_else(|| request_id.clone());
    let budget = body.budget(state.coordinator.pool().config().default_depth)?;
    let request = AnalysisRequest::new(&body.position, body.moves, budget, requester)?;

    tracing::debug!(request_id = %request_id, requester = %request.requester, ?budget, "analysis requested");
    let result = state.coordinator.analyze(request).await?;

    Ok((StatusCode::OK, Json(AnalysisResponse::new(request_id, result))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: &str) -> AnalysisBody {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_body_defaults() {
        let body = body(r#"{"position": "startpos"}"#);
        assert!(body.moves.is_empty());
        assert_eq!(body.requester, None);
        assert_eq!(body.budget(20).unwrap(), SearchBudget::Depth(20));
    }

    #[test]
    fn test_body_budget() {
        let depth = body(r#"{"position": "start", "depth": 7}"#);
        assert_eq!(depth.budget(20).unwrap(), SearchBudget::Depth(7));

        let movetime = body(r#"{"position": "start", "movetime_ms": 250}"#);
        assert_eq!(
            movetime.budget(20).unwrap(),
            SearchBudget::MoveTime(Duration::from_millis(250))
        );

        let both = body(r#"{"position": "start", "depth": 7, "movetime_ms": 250}"#);
        assert!(matches!(both.budget(20), Err(PoolError::InvalidRequest(_))));
    }

    #[test]
    fn test_response_serializes_status_in_snake_case() {
        let response = AnalysisResponse {
            request_id: "id".to_string(),
            requester: "me".to_string(),
            best_move: None,
            evaluation: None,
            mate: None,
            depth: None,
            pv: vec![],
            status: AnalysisStatus::EngineError,
            error: Some("Protocol error: x".to_string()),
            elapsed_ms: 3,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "engine_error");
        assert!(json["best_move"].is_null());
    }
}
