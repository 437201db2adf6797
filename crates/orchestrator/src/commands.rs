use chrono::{DateTime, Utc};
use daily_pnl_core::FaultKind;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum TrackerCommand {
    GetStatus(oneshot::Sender<TrackerStatus>),
    Shutdown,
}

/// Orchestrator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerState {
    /// No usable credentials; waiting for a config change.
    Idle,
    /// Spawning a tracking session.
    Starting,
    /// A session is running.
    Active,
    /// Waiting out the retry delay after a transient fault.
    Backoff,
    /// Shut down. Never left.
    Terminal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerStatus {
    pub state: TrackerState,
    /// Running total of the active session, once its baseline is known.
    pub pnl: Option<f64>,
    pub sessions_started: u64,
    pub last_fault: Option<FaultKind>,
    pub last_heartbeat: DateTime<Utc>,
}
