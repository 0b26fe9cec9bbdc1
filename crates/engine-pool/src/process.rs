//! One UCI engine subprocess.
//!
//! [`EngineProcess`] spawns the engine, performs the `uci`/`isready`
//! handshake and exchanges single protocol lines over the child's pipes.
//! It knows nothing about pooling; the pool decides when a process is
//! trusted, reused or thrown away.

use crate::{EngineConfig, PoolError};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use uci::{EngineMessage, GuiCommand};

/// Maximum number of lines to read before giving up on a handshake reply.
pub const MAX_UCI_LINES: usize = 1000;

/// How long a quitting engine gets before it is killed.
const QUIT_GRACE: Duration = Duration::from_millis(500);

/// A spawned engine that completed its handshake.
pub struct EngineProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    /// The engine's name as reported via `id name`.
    name: String,
    pid: Option<u32>,
}

impl EngineProcess {
    /// Spawn the configured engine and wait for it to become ready.
    ///
    /// # Errors
    ///
    /// Every failure is reported as [`PoolError::EngineUnavailable`]: no path
    /// configured, the binary could not be started, or the handshake failed or
    /// did not finish within the handshake timeout.
    pub async fn spawn(config: &EngineConfig) -> Result<Self, PoolError> {
        let path = config
            .path
            .as_ref()
            .filter(|_| config.is_configured())
            .ok_or_else(|| PoolError::EngineUnavailable("no engine path configured".to_string()))?;

        let mut child = Command::new(path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PoolError::EngineUnavailable(format!("failed to spawn {}: {}", path.display(), e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PoolError::EngineUnavailable("engine stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PoolError::EngineUnavailable("engine stdout not captured".to_string()))?;

        let pid = child.id();
        let mut process = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            name: String::new(),
            pid,
        };

        let handshake_timeout = config.handshake_timeout();
        match tokio::time::timeout(handshake_timeout, process.handshake(config)).await {
            Ok(Ok(())) => Ok(process),
            Ok(Err(e)) => {
                process.kill();
                Err(PoolError::EngineUnavailable(format!("handshake failed: {}", e)))
            }
            Err(_) => {
                process.kill();
                Err(PoolError::EngineUnavailable(format!(
                    "handshake did not finish within {:?}",
                    handshake_timeout
                )))
            }
        }
    }

    /// `uci` → `uciok`, then options, then `isready` → `readyok`.
    async fn handshake(&mut self, config: &EngineConfig) -> Result<(), PoolError> {
        self.send(&GuiCommand::Uci).await?;

        let mut name = None;
        let mut lines_read = 0;
        loop {
            if lines_read > MAX_UCI_LINES {
                return Err(PoolError::ProtocolError("no uciok received".to_string()));
            }
            lines_read += 1;
            match self.read_message().await? {
                EngineMessage::Id { name: Some(n), .. } => name = Some(n),
                EngineMessage::UciOk => break,
                _ => {}
            }
        }
        self.name = name.unwrap_or_else(|| "Unknown Engine".to_string());

        for (option, value) in &config.options {
            self.send(&GuiCommand::SetOption {
                name: option.clone(),
                value: Some(value.clone()),
            })
            .await?;
        }

        self.sync().await
    }

    /// Send `isready` and wait for `readyok`.
    pub async fn sync(&mut self) -> Result<(), PoolError> {
        self.send(&GuiCommand::IsReady).await?;
        let mut lines_read = 0;
        loop {
            if lines_read > MAX_UCI_LINES {
                return Err(PoolError::ProtocolError("no readyok received".to_string()));
            }
            lines_read += 1;
            if self.read_message().await? == EngineMessage::ReadyOk {
                return Ok(());
            }
        }
    }

    /// Returns the engine's name as reported via UCI protocol.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// OS process id, if the process is still running.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Send a command to the engine.
    pub async fn send(&mut self, command: &GuiCommand) -> Result<(), PoolError> {
        let mut line = command.to_uci();
        tracing::trace!(pid = ?self.pid, line = %line, "engine <");
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read and parse the next line of engine output.
    ///
    /// End of output is a protocol error: the engine died or closed stdout.
    pub async fn read_message(&mut self) -> Result<EngineMessage, PoolError> {
        let line = self
            .stdout
            .next_line()
            .await?
            .ok_or_else(|| PoolError::ProtocolError("engine closed its output".to_string()))?;
        tracing::trace!(pid = ?self.pid, line = %line, "engine >");
        Ok(EngineMessage::parse(&line)?)
    }

    /// Non-blocking liveness check.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Kill the process without waiting for it.
    pub fn kill(&mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(pid = ?self.pid, error = %e, "engine already gone");
        }
    }

    /// Ask the engine to exit, killing it if it does not within a short grace period.
    pub async fn quit(mut self) {
        let _ = self.send(&GuiCommand::Quit).await;
        if tokio::time::timeout(QUIT_GRACE, self.child.wait())
            .await
            .is_err()
        {
            self.kill();
        }
    }
}

impl std::fmt::Debug for EngineProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineProcess")
            .field("name", &self.name)
            .field("pid", &self.pid)
            .finish()
    }
}
