//! Supervised UCI engine pool with an analysis coordinator.
//!
//! This crate keeps a fixed number of chess engine subprocesses (Stockfish or
//! any UCI engine) alive and hands them out one request at a time.
//!
//! # Overview
//!
//! - [`EngineConfig`] - Engine binary, pool size and timeouts
//! - [`EngineProcess`] - One spawned engine that completed the UCI handshake
//! - [`EnginePool`] - Owns the engines; `acquire`/`release`, health monitoring, respawn
//! - [`AnalysisCoordinator`] - Runs an [`AnalysisRequest`] on a pooled engine
//! - [`PoolError`] - Error taxonomy shared by all of the above
//!
//! # Example
//!
//! ```ignore
//! use engine_pool::{AnalysisCoordinator, AnalysisRequest, EngineConfig, EnginePool, SearchBudget};
//!
//! let pool = EnginePool::start(EngineConfig::with_path("stockfish")).await;
//! let coordinator = AnalysisCoordinator::new(pool);
//! let request = AnalysisRequest::new("start", vec![], SearchBudget::Depth(18), "docs")?;
//! let result = coordinator.analyze(request).await?;
//! println!("{:?} {:?}", result.best_move, result.evaluation);
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod pool;
pub mod process;
pub mod request;

pub use config::EngineConfig;
pub use coordinator::{AnalysisCoordinator, RequestState};
pub use error::PoolError;
pub use pool::{EngineHandle, EnginePool, PoolStatus, SlotState, SlotStatus};
pub use process::EngineProcess;
pub use request::{AnalysisRequest, AnalysisResult, AnalysisStatus, Position, SearchBudget};
