//! Integration tests against a real Stockfish.
//!
//! These tests require Stockfish to be installed and available in PATH.
//! Run with: `cargo test -p engine-pool --test stockfish -- --ignored`

use engine_pool::{
    AnalysisCoordinator, AnalysisRequest, AnalysisStatus, EngineConfig, EnginePool, SearchBudget,
};
use std::time::Duration;

/// Check if Stockfish is available in PATH.
fn stockfish_available() -> bool {
    std::process::Command::new("stockfish")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

fn stockfish_config() -> EngineConfig {
    let mut config = EngineConfig::with_path("stockfish");
    config.options.insert("Threads".to_string(), "1".to_string());
    config.options.insert("Hash".to_string(), "16".to_string());
    config
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_stockfish_pool_is_ready() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let pool = EnginePool::start(stockfish_config()).await;
    let status = pool.status();
    assert!(status.ready);
    assert!(status
        .slots
        .iter()
        .all(|s| s.engine.as_deref().unwrap_or("").to_lowercase().contains("stockfish")));
    pool.shutdown().await;
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_stockfish_finds_mate_in_one() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let coordinator = AnalysisCoordinator::new(EnginePool::start(stockfish_config()).await);

    // Scholar's mate set up: 1.e4 e5 2.Qh5 Nc6 3.Bc4 Nf6?? and White plays Qxf7#
    let request = AnalysisRequest::new(
        "start",
        ["e2e4", "e7e5", "d1h5", "b8c6", "f1c4", "g8f6"]
            .iter()
            .map(|m| m.to_string())
            .collect(),
        SearchBudget::Depth(10),
        "stockfish-test",
    )
    .unwrap();

    let result = coordinator.analyze(request).await.unwrap();
    assert_eq!(result.status, AnalysisStatus::Ok);
    assert_eq!(result.best_move.as_deref(), Some("h5f7"));
    assert_eq!(result.mate, Some(1));
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_stockfish_movetime_budget() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let coordinator = AnalysisCoordinator::new(EnginePool::start(stockfish_config()).await);
    let request = AnalysisRequest::new(
        "start",
        vec![],
        SearchBudget::MoveTime(Duration::from_millis(300)),
        "stockfish-test",
    )
    .unwrap();

    let result = coordinator.analyze(request).await.unwrap();
    assert!(result.is_ok());
    assert!(result.best_move.is_some());
    assert!(result.evaluation.unwrap().abs() < 1.5);
}
