//! Supervised pool of engine subprocesses.
//!
//! The pool owns `pool_size` slots. Each slot holds at most one
//! [`EngineProcess`] and is `Idle`, `Busy` or `Dead`. A semaphore counts idle
//! slots: a caller takes a permit, then claims an idle slot under the slot
//! lock, so there is never a permit without an idle slot to back it.
//!
//! The slot lock guards metadata only. It is never held across an `.await`
//! or while talking to an engine.
//!
//! Checked-out engines are handed out as [`EngineHandle`]s. A handle goes back
//! to `Idle` only through [`EnginePool::release`] with its desync flag clear;
//! every other exit (desync, dropped future, dead process) kills the process
//! and respawns the slot in the background.

use crate::{EngineConfig, EngineProcess, PoolError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Lifecycle state of one pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// Live engine waiting for work.
    Idle,
    /// Checked out by a caller.
    Busy,
    /// No usable engine; waiting for (or undergoing) respawn.
    Dead,
}

struct Slot {
    id: usize,
    state: SlotState,
    process: Option<EngineProcess>,
    pid: Option<u32>,
    engine_name: Option<String>,
    last_activity: DateTime<Utc>,
    respawns: u64,
    /// A respawn task for this slot is in flight.
    respawning: bool,
}

impl Slot {
    fn dead(id: usize) -> Self {
        Self {
            id,
            state: SlotState::Dead,
            process: None,
            pid: None,
            engine_name: None,
            last_activity: Utc::now(),
            respawns: 0,
            respawning: false,
        }
    }

    fn install(&mut self, process: EngineProcess) {
        self.pid = process.pid();
        self.engine_name = Some(process.name().to_string());
        self.process = Some(process);
        self.state = SlotState::Idle;
        self.last_activity = Utc::now();
    }

    /// Mark the slot dead, killing its process. Returns true if the caller
    /// should start a respawn task.
    fn bury(&mut self) -> bool {
        if let Some(mut process) = self.process.take() {
            process.kill();
        }
        self.state = SlotState::Dead;
        self.pid = None;
        self.last_activity = Utc::now();
        if self.respawning {
            false
        } else {
            self.respawning = true;
            true
        }
    }
}

/// Why the pool cannot serve requests at all.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Availability {
    Ready,
    /// No engine path was configured; nothing was spawned.
    Unconfigured,
    /// Every slot failed its first spawn.
    Unavailable(String),
}

struct Shared {
    config: EngineConfig,
    availability: Availability,
    slots: Mutex<Vec<Slot>>,
    /// One permit per idle slot.
    idle: Semaphore,
    closed: AtomicBool,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn slots(&self) -> MutexGuard<'_, Vec<Slot>> {
        // A panic while holding the lock leaves metadata that is still
        // internally consistent, so keep going with it.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim an idle slot for a caller that already holds a permit.
    ///
    /// Returns `None` when the claimed slot's engine turned out to be dead;
    /// that slot is buried and respawned, and the permit is gone with it.
    fn checkout(self: &Arc<Self>) -> Option<EngineHandle> {
        let mut slots = self.slots();
        let slot = slots.iter_mut().find(|s| s.state == SlotState::Idle)?;

        let alive = slot.process.as_mut().is_some_and(EngineProcess::is_alive);
        if !alive {
            tracing::warn!(slot = slot.id, pid = ?slot.pid, "idle engine exited, respawning");
            let id = slot.id;
            let respawn = slot.bury();
            drop(slots);
            if respawn {
                self.schedule_respawn(id);
            }
            return None;
        }

        slot.state = SlotState::Busy;
        slot.last_activity = Utc::now();
        let process = slot.process.take();
        Some(EngineHandle {
            slot: slot.id,
            pid: slot.pid,
            process,
            desynced: false,
            shared: Arc::clone(self),
        })
    }

    /// Take a process back from a handle.
    fn check_in(self: &Arc<Self>, slot: usize, mut process: Option<EngineProcess>, desynced: bool) {
        let reusable = !desynced
            && !self.closed.load(Ordering::SeqCst)
            && process.as_mut().is_some_and(EngineProcess::is_alive);

        let mut slots = self.slots();
        let entry = &mut slots[slot];
        entry.last_activity = Utc::now();
        entry.process = process;

        if reusable {
            entry.state = SlotState::Idle;
            drop(slots);
            self.idle.add_permits(1);
        } else {
            let respawn = entry.bury();
            drop(slots);
            tracing::info!(slot, desynced, "engine discarded");
            if respawn {
                self.schedule_respawn(slot);
            }
        }
    }

    /// Start a background respawn if a runtime is around; otherwise the
    /// health monitor picks the slot up on its next pass.
    fn schedule_respawn(self: &Arc<Self>, slot: usize) {
        if self.closed.load(Ordering::SeqCst) {
            self.slots()[slot].respawning = false;
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(respawn(Arc::clone(self), slot));
            }
            Err(_) => {
                self.slots()[slot].respawning = false;
            }
        }
    }

    /// One health monitor pass: bury idle engines that exited and restart
    /// dead slots nobody is respawning.
    fn check_health(self: &Arc<Self>) {
        let mut to_respawn = Vec::new();
        {
            let mut slots = self.slots();
            for slot in slots.iter_mut() {
                match slot.state {
                    SlotState::Idle => {
                        let alive = slot.process.as_mut().is_some_and(EngineProcess::is_alive);
                        if alive {
                            continue;
                        }
                        // Only take the slot out of rotation if its permit is
                        // free; otherwise a caller is about to claim it and
                        // will notice the dead process itself.
                        let Ok(permit) = self.idle.try_acquire() else {
                            continue;
                        };
                        permit.forget();
                        tracing::warn!(slot = slot.id, pid = ?slot.pid, "health check found dead engine");
                        if slot.bury() {
                            to_respawn.push(slot.id);
                        }
                    }
                    SlotState::Dead if !slot.respawning => {
                        slot.respawning = true;
                        to_respawn.push(slot.id);
                    }
                    _ => {}
                }
            }
        }
        for slot in to_respawn {
            self.schedule_respawn(slot);
        }
    }
}

async fn respawn(shared: Arc<Shared>, slot: usize) {
    match EngineProcess::spawn(&shared.config).await {
        Ok(process) => {
            if shared.closed.load(Ordering::SeqCst) {
                process.quit().await;
                shared.slots()[slot].respawning = false;
                return;
            }
            let pid = process.pid();
            {
                let mut slots = shared.slots();
                let entry = &mut slots[slot];
                entry.install(process);
                entry.respawns += 1;
                entry.respawning = false;
            }
            shared.idle.add_permits(1);
            tracing::info!(slot, ?pid, "engine respawned");
        }
        Err(e) => {
            shared.slots()[slot].respawning = false;
            tracing::warn!(slot, error = %e, "engine respawn failed");
        }
    }
}

async fn monitor(shared: Weak<Shared>, interval: std::time::Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };
        if shared.closed.load(Ordering::SeqCst) {
            break;
        }
        shared.check_health();
    }
}

/// An engine checked out of the pool.
///
/// Give it back with [`EnginePool::release`]. Dropping it instead is treated
/// as a protocol desync: the process is killed and the slot respawned.
pub struct EngineHandle {
    slot: usize,
    pid: Option<u32>,
    process: Option<EngineProcess>,
    desynced: bool,
    shared: Arc<Shared>,
}

impl EngineHandle {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// The engine process. Only taken out when the handle is checked back
    /// in, which consumes or drops the handle.
    pub fn process(&mut self) -> &mut EngineProcess {
        self.process
            .as_mut()
            .expect("engine handle used after it was returned to the pool")
    }

    /// Flag the engine's protocol state as untrustworthy so release respawns it.
    pub fn mark_desynced(&mut self) {
        self.desynced = true;
    }

    pub fn is_desynced(&self) -> bool {
        self.desynced
    }

    fn check_in(&mut self, desynced: bool) {
        if let Some(process) = self.process.take() {
            self.shared.check_in(self.slot, Some(process), desynced);
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if self.process.is_some() {
            tracing::debug!(slot = self.slot, "engine handle dropped without release");
            self.check_in(true);
        }
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("slot", &self.slot)
            .field("pid", &self.pid)
            .field("desynced", &self.desynced)
            .finish()
    }
}

/// Per-slot entry of a [`PoolStatus`].
#[derive(Debug, Clone, Serialize)]
pub struct SlotStatus {
    pub id: usize,
    pub state: SlotState,
    pub pid: Option<u32>,
    pub engine: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub respawns: u64,
}

/// Point-in-time view of the pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    /// At least one engine completed its handshake and is alive.
    pub ready: bool,
    /// Configured engine binary.
    pub path: Option<String>,
    /// Why the pool is not ready, if it is not.
    pub reason: Option<String>,
    pub size: usize,
    pub idle: usize,
    pub busy: usize,
    pub dead: usize,
    pub slots: Vec<SlotStatus>,
}

/// Pool of UCI engine subprocesses.
///
/// Cloning is cheap; all clones share the same engines.
#[derive(Clone)]
pub struct EnginePool {
    shared: Arc<Shared>,
}

impl EnginePool {
    /// Spawn `pool_size` engines and start the health monitor.
    ///
    /// Never fails: without a configured path nothing is spawned, and if every
    /// slot fails its first spawn the pool stays permanently unavailable.
    /// Both cases surface as [`PoolError::EngineUnavailable`] on
    /// [`acquire`](Self::acquire) and `ready: false` in [`status`](Self::status).
    /// Slots that fail while others succeed are retried by the monitor.
    pub async fn start(config: EngineConfig) -> Self {
        let size = config.pool_size.max(1);
        let mut slots: Vec<Slot> = (0..size).map(Slot::dead).collect();

        let availability = if !config.is_configured() {
            tracing::warn!("no engine path configured, engine pool unavailable");
            Availability::Unconfigured
        } else {
            let spawns = (0..size).map(|_| EngineProcess::spawn(&config));
            let results = futures_util::future::join_all(spawns).await;

            let mut last_error = None;
            for (slot, result) in slots.iter_mut().zip(results) {
                match result {
                    Ok(process) => {
                        tracing::info!(
                            slot = slot.id,
                            pid = ?process.pid(),
                            engine = %process.name(),
                            "engine ready"
                        );
                        slot.install(process);
                    }
                    Err(e) => {
                        tracing::warn!(slot = slot.id, error = %e, "engine failed to start");
                        last_error = Some(match e {
                            PoolError::EngineUnavailable(reason) => reason,
                            other => other.to_string(),
                        });
                    }
                }
            }

            if slots.iter().all(|s| s.state == SlotState::Dead) {
                let reason = last_error.unwrap_or_else(|| "no engine started".to_string());
                tracing::error!(%reason, "engine pool unavailable");
                Availability::Unavailable(reason)
            } else {
                Availability::Ready
            }
        };

        let idle = slots.iter().filter(|s| s.state == SlotState::Idle).count();
        let interval = config.health_check_interval();
        let shared = Arc::new(Shared {
            config,
            availability,
            slots: Mutex::new(slots),
            idle: Semaphore::new(idle),
            closed: AtomicBool::new(false),
            monitor: Mutex::new(None),
        });

        if shared.availability == Availability::Ready {
            let task = tokio::spawn(monitor(Arc::downgrade(&shared), interval));
            *shared.monitor.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);
        }

        Self { shared }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    fn check_available(&self) -> Result<(), PoolError> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(PoolError::EngineUnavailable("engine pool is shut down".to_string()));
        }
        match &self.shared.availability {
            Availability::Ready => Ok(()),
            Availability::Unconfigured => Err(PoolError::EngineUnavailable(
                "no engine path configured".to_string(),
            )),
            Availability::Unavailable(reason) => {
                Err(PoolError::EngineUnavailable(reason.clone()))
            }
        }
    }

    /// Wait up to the acquire timeout for an idle engine and check it out.
    ///
    /// # Errors
    ///
    /// - [`PoolError::EngineUnavailable`] if the pool cannot serve at all
    /// - [`PoolError::PoolExhausted`] if no engine became idle in time
    pub async fn acquire(&self) -> Result<EngineHandle, PoolError> {
        self.check_available()?;

        let timeout = self.shared.config.acquire_timeout();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let permit = match tokio::time::timeout_at(deadline, self.shared.idle.acquire()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => {
                    return Err(PoolError::EngineUnavailable(
                        "engine pool is shut down".to_string(),
                    ))
                }
                Err(_) => return Err(PoolError::PoolExhausted(timeout)),
            };
            permit.forget();

            if let Some(handle) = self.shared.checkout() {
                tracing::debug!(slot = handle.slot, pid = ?handle.pid, "engine acquired");
                return Ok(handle);
            }
        }
    }

    /// Return a handle. Desynced or dead engines are killed and respawned
    /// instead of going back to `Idle`.
    pub fn release(&self, mut handle: EngineHandle) {
        let desynced = handle.desynced;
        handle.check_in(desynced);
    }

    /// Snapshot of readiness and per-slot state.
    pub fn status(&self) -> PoolStatus {
        let slots = self.shared.slots();
        let count = |state| slots.iter().filter(|s| s.state == state).count();
        let (idle, busy, dead) = (
            count(SlotState::Idle),
            count(SlotState::Busy),
            count(SlotState::Dead),
        );

        let reason = match &self.shared.availability {
            Availability::Unconfigured => Some("no engine path configured".to_string()),
            Availability::Unavailable(reason) => Some(reason.clone()),
            Availability::Ready if self.shared.closed.load(Ordering::SeqCst) => {
                Some("engine pool is shut down".to_string())
            }
            Availability::Ready if idle + busy == 0 => {
                Some("all engines are restarting".to_string())
            }
            Availability::Ready => None,
        };

        PoolStatus {
            ready: reason.is_none(),
            path: self
                .shared
                .config
                .path
                .as_ref()
                .map(|p| p.display().to_string()),
            reason,
            size: slots.len(),
            idle,
            busy,
            dead,
            slots: slots
                .iter()
                .map(|s| SlotStatus {
                    id: s.id,
                    state: s.state,
                    pid: s.pid,
                    engine: s.engine_name.clone(),
                    last_activity: s.last_activity,
                    respawns: s.respawns,
                })
                .collect(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status().ready
    }

    /// Stop the health monitor, refuse new work and quit idle engines.
    ///
    /// Engines that are checked out are killed when their handles come back.
    pub async fn shutdown(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.idle.close();
        if let Some(task) = self
            .shared
            .monitor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            task.abort();
        }

        let idle: Vec<EngineProcess> = {
            let mut slots = self.shared.slots();
            slots
                .iter_mut()
                .filter(|s| s.state == SlotState::Idle)
                .filter_map(|s| {
                    s.state = SlotState::Dead;
                    s.pid = None;
                    s.process.take()
                })
                .collect()
        };
        futures_util::future::join_all(idle.into_iter().map(EngineProcess::quit)).await;
        tracing::info!("engine pool shut down");
    }
}

impl std::fmt::Debug for EnginePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnginePool")
            .field("availability", &self.shared.availability)
            .field("size", &self.shared.config.pool_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_pool_is_not_ready() {
        let pool = EnginePool::start(EngineConfig::default()).await;
        let status = pool.status();

        assert!(!status.ready);
        assert_eq!(status.path, None);
        assert_eq!(status.reason.as_deref(), Some("no engine path configured"));
        assert_eq!(status.size, 2);
        assert_eq!(status.dead, 2);
        assert!(status.slots.iter().all(|s| s.pid.is_none()));
    }

    #[tokio::test]
    async fn test_unconfigured_pool_fails_acquire_immediately() {
        let pool = EnginePool::start(EngineConfig::default()).await;
        let started = std::time::Instant::now();
        match pool.acquire().await {
            Err(PoolError::EngineUnavailable(_)) => {}
            other => panic!("Expected EngineUnavailable, got {:?}", other),
        }
        assert!(started.elapsed() < std::time::Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_missing_binary_makes_pool_permanently_unavailable() {
        let config = EngineConfig {
            pool_size: 3,
            ..EngineConfig::with_path("/nonexistent/path/to/stockfish")
        };
        let pool = EnginePool::start(config).await;
        let status = pool.status();

        assert!(!status.ready);
        assert_eq!(status.path.as_deref(), Some("/nonexistent/path/to/stockfish"));
        assert!(status.reason.unwrap().contains("failed to spawn"));
        assert!(matches!(pool.acquire().await, Err(PoolError::EngineUnavailable(_))));
    }

    #[tokio::test]
    async fn test_status_serializes_states_in_snake_case() {
        let pool = EnginePool::start(EngineConfig::default()).await;
        let json = serde_json::to_value(pool.status()).unwrap();
        assert_eq!(json["ready"], false);
        assert_eq!(json["slots"][0]["state"], "dead");
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let pool = EnginePool::start(EngineConfig::default()).await;
        pool.shutdown().await;
        pool.shutdown().await;
        assert!(matches!(pool.acquire().await, Err(PoolError::EngineUnavailable(_))));
    }
}
