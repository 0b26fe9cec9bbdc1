//! chessOS server
//!
//! Serves the play-bot API on top of a pool of UCI engine subprocesses.

use anyhow::Context;
use chessos_server::config::Settings;
use chessos_server::{router, AppState};
use clap::Parser;
use engine_pool::EnginePool;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chessos-server")]
#[command(about = "chessOS play-bot API server")]
struct Cli {
    /// Settings file (default: ./chessos.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the settings file and CHESSOS_BIND
    #[arg(short, long)]
    bind: Option<std::net::SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(bind) = cli.bind {
        settings.bind = bind;
    }

    let pool = EnginePool::start(settings.engine.clone()).await;
    let status = pool.status();
    tracing::info!(
        ready = status.ready,
        size = status.size,
        path = ?status.path,
        reason = ?status.reason,
        "engine pool started"
    );

    let app = router(AppState::new(pool.clone()));

    let listener = tokio::net::TcpListener::bind(settings.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind))?;
    tracing::info!("Server running on http://{}", settings.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
