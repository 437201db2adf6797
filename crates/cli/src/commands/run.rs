//! Long-running tracker command.

use super::{config_path, load_config};
use anyhow::Result;
use clap::Args;
use daily_pnl_bitunix::BitunixConnector;
use daily_pnl_core::{ConfigStore, ConfigWatcher};
use daily_pnl_orchestrator::orchestrator::STATUS_INACTIVE;
use daily_pnl_orchestrator::{
    Collaborators, FilePersistence, LogNotifier, Orchestrator, OrchestratorSettings,
    SessionContext, StatusBoard,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Config file path (defaults to ~/.daily-pnl/config.json)
    #[arg(short, long, env = "DAILY_PNL_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Runs the tracker until SIGINT or SIGTERM.
///
/// # Errors
/// Returns an error if the config cannot be loaded or a signal handler
/// cannot be installed.
pub async fn run_tracker(args: RunArgs) -> Result<()> {
    let path = config_path(args.config);
    tracing::info!(config = %path.display(), "Starting daily PnL tracker");

    let config = load_config(&path)?;
    let store = ConfigStore::with_path(config.clone(), path.clone());

    let status = Arc::new(StatusBoard::new(STATUS_INACTIVE));
    let mut status_rx = status.subscribe();
    let status_task = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let line = status_rx.borrow_and_update().clone();
            tracing::info!(status = %line, "Status changed");
        }
    });

    let watcher = ConfigWatcher::new(store.clone());
    let watch_path = path.clone();
    let watcher_task = tokio::spawn(async move {
        if let Err(e) = watcher.watch(&watch_path).await {
            tracing::error!(error = %e, "Config watcher stopped");
        }
    });

    let collaborators = Collaborators {
        session: SessionContext {
            connector: Arc::new(BitunixConnector::new(
                config.api_url.clone(),
                config.ws_url.clone(),
            )),
            status: status.clone(),
            persistence: Arc::new(FilePersistence),
        },
        notifier: Arc::new(LogNotifier),
    };
    let (handle, mut tracker_task) = Orchestrator::spawn(
        OrchestratorSettings::from_config(&config),
        store,
        collaborators,
    );

    tokio::select! {
        res = shutdown_signal() => {
            res?;
            if let Err(e) = handle.shutdown().await {
                tracing::warn!(error = %e, "Tracker already stopped");
            }
            if let Err(e) = (&mut tracker_task).await {
                tracing::error!(error = %e, "Tracker task failed");
            }
        }
        res = &mut tracker_task => {
            if let Err(e) = res {
                tracing::error!(error = %e, "Tracker task failed");
            }
        }
    }

    watcher_task.abort();
    status_task.abort();
    tracing::info!("Daily PnL tracker stopped");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    Ok(())
}
