//! Router tests. No engine is configured here, so analysis requests exercise
//! validation and the unavailable path.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chessos_server::{router, AppState};
use engine_pool::{EngineConfig, EnginePool};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

async fn unconfigured_app() -> Router {
    router(AppState::new(EnginePool::start(EngineConfig::default()).await))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn analysis(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/play-bot/analysis")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(unconfigured_app().await, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "chessos");
}

#[tokio::test]
async fn test_status_without_engine_is_not_ready() {
    let request = Request::builder()
        .uri("/api/v1/play-bot/status")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(unconfigured_app().await, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "unavailable");
    assert_eq!(json["ready"], false);
    assert!(json["path"].is_null());
    assert_eq!(json["reason"], "no engine path configured");
}

#[tokio::test]
async fn test_analysis_without_engine_is_service_unavailable() {
    let (status, json) = send(
        unconfigured_app().await,
        analysis(r#"{"position": "startpos", "depth": 5}"#),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "engine_unavailable");
    assert!(json["message"].as_str().unwrap().contains("no engine path"));
}

#[tokio::test]
async fn test_analysis_rejects_bad_position() {
    let (status, json) = send(
        unconfigured_app().await,
        analysis(r#"{"position": "not a fen"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_request");
}

#[tokio::test]
async fn test_analysis_body_errors_are_json_bad_requests() {
    for body in [
        r#"{"depth": 5}"#,
        r#"{"position": "startpos", "depth": -1}"#,
        r#"{"position": "startpos""#,
    ] {
        let (status, json) = send(unconfigured_app().await, analysis(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
        assert_eq!(json["error"], "invalid_request", "body {}", body);
    }
}

#[tokio::test]
async fn test_analysis_without_content_type_is_json_bad_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/play-bot/analysis")
        .body(Body::from(r#"{"position": "startpos"}"#))
        .unwrap();
    let (status, json) = send(unconfigured_app().await, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_request");
    assert!(json["message"].as_str().unwrap().contains("Content-Type"));
}

#[tokio::test]
async fn test_analysis_rejects_fen_with_smuggled_moves() {
    let (status, json) = send(
        unconfigured_app().await,
        analysis(r#"{"position": "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w moves e2e4"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("castling"));
}

#[tokio::test]
async fn test_analysis_rejects_bad_moves() {
    let (status, _) = send(
        unconfigured_app().await,
        analysis(r#"{"position": "startpos", "moves": ["e4"]}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analysis_rejects_two_budgets() {
    let (status, json) = send(
        unconfigured_app().await,
        analysis(r#"{"position": "startpos", "depth": 5, "movetime_ms": 100}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("not both"));
}

#[tokio::test]
async fn test_analysis_rejects_out_of_range_depth() {
    let (status, _) = send(
        unconfigured_app().await,
        analysis(r#"{"position": "startpos", "depth": 0}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let request = Request::builder()
        .uri("/api/v1/nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(unconfigured_app().await, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
