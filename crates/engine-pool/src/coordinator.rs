//! Turns [`AnalysisRequest`]s into [`AnalysisResult`]s.
//!
//! Each request walks `Pending → Dispatched → (Completed | TimedOut | Errored)`.
//! Failures before dispatch (bad request, no engine, pool exhausted) are
//! returned as errors; anything after dispatch becomes a result with a status.

use crate::{
    AnalysisRequest, AnalysisResult, AnalysisStatus, EngineHandle, EnginePool, EngineProcess,
    PoolError,
};
use std::time::{Duration, Instant};
use uci::{EngineMessage, GuiCommand, Score};

/// How long the `stop` sent to a timed-out engine may take to write.
const STOP_WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// Lifecycle of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Waiting for an engine.
    Pending,
    /// Sent to an engine, waiting for `bestmove`.
    Dispatched,
    Completed,
    TimedOut,
    Errored,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Completed | RequestState::TimedOut | RequestState::Errored
        )
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_advance_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Pending, Dispatched)
                | (Pending, Errored)
                | (Dispatched, Completed)
                | (Dispatched, TimedOut)
                | (Dispatched, Errored)
        )
    }
}

/// Tracks one request's state and logs its transitions.
struct Tracker<'a> {
    requester: &'a str,
    state: RequestState,
}

impl<'a> Tracker<'a> {
    fn new(requester: &'a str) -> Self {
        Self {
            requester,
            state: RequestState::Pending,
        }
    }

    fn advance(&mut self, next: RequestState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(requester = %self.requester, from = ?self.state, to = ?next, "request state");
        self.state = next;
    }
}

impl Drop for Tracker<'_> {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            // The caller dropped the future; the engine handle's own drop
            // takes care of the engine.
            tracing::info!(requester = %self.requester, state = ?self.state, "analysis abandoned");
        }
    }
}

/// What the engine reported for one search.
#[derive(Debug, Default)]
struct SearchOutcome {
    best_move: Option<String>,
    score: Option<Score>,
    depth: Option<u32>,
    pv: Vec<String>,
}

/// Runs analysis requests against an [`EnginePool`].
#[derive(Debug, Clone)]
pub struct AnalysisCoordinator {
    pool: EnginePool,
}

impl AnalysisCoordinator {
    pub fn new(pool: EnginePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &EnginePool {
        &self.pool
    }

    /// Analyze one position.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidRequest`] if the budget is outside the configured limits
    /// - [`PoolError::EngineUnavailable`] if the pool cannot serve at all
    /// - [`PoolError::PoolExhausted`] if no engine became idle within the acquire timeout
    ///
    /// Once an engine has the request, the outcome is always `Ok` with the
    /// status telling whether the search completed, timed out or failed.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, PoolError> {
        let started = Instant::now();
        let mut tracker = Tracker::new(&request.requester);

        let mut handle = match self.checkout(&request).await {
            Ok(handle) => handle,
            Err(e) => {
                tracker.advance(RequestState::Errored);
                tracing::info!(requester = %request.requester, error = %e, "analysis rejected");
                return Err(e);
            }
        };
        tracker.advance(RequestState::Dispatched);

        let deadline = request.budget.deadline(self.pool.config());
        let outcome = tokio::time::timeout(deadline, search(handle.process(), &request)).await;

        let result = match outcome {
            Ok(Ok(search)) => {
                tracker.advance(RequestState::Completed);
                AnalysisResult::completed(
                    &request,
                    search.best_move,
                    search.score,
                    search.depth,
                    search.pv,
                    started.elapsed(),
                )
            }
            Ok(Err(e)) => {
                tracker.advance(RequestState::Errored);
                tracing::warn!(
                    requester = %request.requester,
                    slot = handle.slot(),
                    error = %e,
                    "engine failed during analysis"
                );
                handle.mark_desynced();
                AnalysisResult::failed(&request, AnalysisStatus::EngineError, &e, started.elapsed())
            }
            Err(_) => {
                tracker.advance(RequestState::TimedOut);
                tracing::warn!(
                    requester = %request.requester,
                    slot = handle.slot(),
                    deadline_ms = deadline.as_millis() as u64,
                    "analysis timed out"
                );
                let _ = tokio::time::timeout(
                    STOP_WRITE_TIMEOUT,
                    handle.process().send(&GuiCommand::Stop),
                )
                .await;
                handle.mark_desynced();
                AnalysisResult::failed(
                    &request,
                    AnalysisStatus::Timeout,
                    &PoolError::Timeout(deadline),
                    started.elapsed(),
                )
            }
        };
        self.pool.release(handle);

        tracing::info!(
            requester = %result.requester,
            status = ?result.status,
            best_move = ?result.best_move,
            duration_ms = result.elapsed_ms,
            "analysis finished"
        );
        Ok(result)
    }

    async fn checkout(&self, request: &AnalysisRequest) -> Result<EngineHandle, PoolError> {
        request.validate(self.pool.config())?;
        self.pool.acquire().await
    }
}

/// Reset the engine, send the position and `go`, then read until `bestmove`.
///
/// Handshake replies showing up mid-search mean the engine is answering
/// something else; that is reported as a protocol error.
async fn search(
    process: &mut EngineProcess,
    request: &AnalysisRequest,
) -> Result<SearchOutcome, PoolError> {
    // Pooled engines serve unrelated requests, so drop the previous game's
    // hash and history before each one.
    process.send(&GuiCommand::UciNewGame).await?;
    process.sync().await?;
    process.send(&request.position_command()).await?;
    process.send(&GuiCommand::Go(request.budget.go_options())).await?;

    let mut outcome = SearchOutcome::default();
    loop {
        match process.read_message().await? {
            EngineMessage::Info(info) => {
                if info.is_exact_main_line() {
                    outcome.score = info.score;
                    outcome.depth = info.depth.or(outcome.depth);
                    if !info.pv.is_empty() {
                        outcome.pv = info.pv;
                    }
                }
            }
            EngineMessage::BestMove { mv, .. } => {
                outcome.best_move = mv;
                return Ok(outcome);
            }
            EngineMessage::Unknown(line) => {
                tracing::debug!(line = %line, "ignoring engine output");
            }
            unexpected => {
                return Err(PoolError::ProtocolError(format!(
                    "unexpected '{}' while searching",
                    unexpected.to_uci()
                )));
            }
        }
    }
}
