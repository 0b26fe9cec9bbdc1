//! Helpers shared by the engine pool integration tests.

#![allow(dead_code)]

use engine_pool::{EngineConfig, EnginePool, PoolStatus};
use std::time::Duration;

/// Path of the scripted engine built alongside these tests.
pub const MOCK_ENGINE: &str = env!("CARGO_BIN_EXE_mock-engine");

/// Pool config running the mock engine with `args`, with short timeouts.
pub fn mock_config(pool_size: usize, args: &[&str]) -> EngineConfig {
    EngineConfig {
        args: args.iter().map(|a| a.to_string()).collect(),
        pool_size,
        acquire_timeout_ms: 5_000,
        handshake_timeout_ms: 2_000,
        depth_timeout_ms: 2_000,
        movetime_grace_ms: 1_000,
        health_check_interval_ms: 50,
        ..EngineConfig::with_path(MOCK_ENGINE)
    }
}

pub async fn mock_pool(pool_size: usize, args: &[&str]) -> EnginePool {
    EnginePool::start(mock_config(pool_size, args)).await
}

/// Poll the pool status until `pred` holds, panicking after five seconds.
pub async fn wait_for_status(pool: &EnginePool, pred: impl Fn(&PoolStatus) -> bool) -> PoolStatus {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let status = pool.status();
        if pred(&status) {
            return status;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("pool never reached expected state: {:?}", status);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
