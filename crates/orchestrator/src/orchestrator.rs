//! Daily orchestrator: owns the tracking session lifecycle.
//!
//! The orchestrator is an actor driven by a single loop. Each pass waits in
//! one [`Phase`] on whichever of its inputs fires first: the day boundary, a
//! config change, the session outcome, a retry deadline or a command. At
//! most one session exists at a time, and a session is always fully stopped
//! before the next one is spawned.

use crate::accumulator::PnlAccumulator;
use crate::commands::{TrackerCommand, TrackerState, TrackerStatus};
use crate::handle::TrackerHandle;
use crate::session::{SessionContext, SessionParams, TrackingSession};
use chrono::Utc;
use daily_pnl_core::window::until_next_midnight;
use daily_pnl_core::{
    ConfigStore, FaultKind, Notifier, SessionOutcome, StatusSink, TrackerConfig,
};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Title used for every user notification.
pub const NOTIFICATION_TITLE: &str = "TradingIQ PNL Tracker";

pub const STATUS_STARTING: &str = "Running...";
pub const STATUS_INACTIVE: &str = "Inactive...";
pub const STATUS_AUTH_ERROR: &str = "Authentication Error";
pub const STATUS_TIMEOUT_ERROR: &str = "Timeout Error";
pub const STATUS_ERROR: &str = "Error";
pub const STATUS_EXITING: &str = "Exiting...";

const COMMAND_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Delay before retrying after a network or timeout fault.
    pub backoff: Duration,
}

impl OrchestratorSettings {
    #[must_use]
    pub const fn from_config(config: &TrackerConfig) -> Self {
        Self {
            backoff: config.backoff(),
        }
    }
}

/// Everything the orchestrator and its sessions talk to.
#[derive(Clone)]
pub struct Collaborators {
    pub session: SessionContext,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    fn status(&self) -> &dyn StatusSink {
        self.session.status.as_ref()
    }
}

/// A running session as seen by the orchestrator.
struct ActiveSession {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    outcome_rx: oneshot::Receiver<SessionOutcome>,
    accumulator: Arc<OnceLock<Arc<PnlAccumulator>>>,
    midnight: Instant,
}

impl ActiveSession {
    fn pnl(&self) -> Option<f64> {
        self.accumulator.get().map(|acc| acc.read())
    }
}

enum Phase {
    Idle,
    Starting,
    Active(ActiveSession),
    Backoff(Instant),
    Terminal,
}

impl Phase {
    const fn state(&self) -> TrackerState {
        match self {
            Self::Idle => TrackerState::Idle,
            Self::Starting => TrackerState::Starting,
            Self::Active(_) => TrackerState::Active,
            Self::Backoff(_) => TrackerState::Backoff,
            Self::Terminal => TrackerState::Terminal,
        }
    }
}

/// What a command asks of the loop.
enum Flow {
    Continue,
    Shutdown,
}

pub struct Orchestrator {
    settings: OrchestratorSettings,
    config: ConfigStore,
    config_rx: watch::Receiver<TrackerConfig>,
    collaborators: Collaborators,
    rx: mpsc::Receiver<TrackerCommand>,
    state_tx: watch::Sender<TrackerState>,
    sessions_started: u64,
    last_fault: Option<FaultKind>,
}

impl Orchestrator {
    /// Spawns the orchestrator on the current runtime.
    ///
    /// The returned task finishes once the orchestrator reaches
    /// [`TrackerState::Terminal`].
    #[must_use]
    pub fn spawn(
        settings: OrchestratorSettings,
        config: ConfigStore,
        collaborators: Collaborators,
    ) -> (TrackerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (state_tx, state_rx) = watch::channel(TrackerState::Starting);
        let config_rx = config.subscribe();

        let orchestrator = Self {
            settings,
            config,
            config_rx,
            collaborators,
            rx,
            state_tx,
            sessions_started: 0,
            last_fault: None,
        };
        let task = tokio::spawn(orchestrator.run());

        (TrackerHandle::new(tx, state_rx), task)
    }

    pub async fn run(mut self) {
        tracing::info!(backoff = ?self.settings.backoff, "Orchestrator starting");

        self.config_rx.borrow_and_update();
        let mut phase = if self.config.current().credentials().is_some() {
            Phase::Starting
        } else {
            tracing::info!("No credentials configured, waiting for configuration");
            self.collaborators.status().set_status(STATUS_INACTIVE);
            Phase::Idle
        };

        loop {
            self.publish(phase.state());
            phase = match phase {
                Phase::Idle => self.idle().await,
                Phase::Starting => self.start_session(),
                Phase::Active(session) => self.active(session).await,
                Phase::Backoff(deadline) => self.backoff(deadline).await,
                Phase::Terminal => break,
            };
        }

        tracing::info!(sessions = self.sessions_started, "Orchestrator stopped");
    }

    fn publish(&self, state: TrackerState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            tracing::debug!(from = ?*current, to = ?state, "Tracker state transition");
            *current = state;
            true
        });
    }

    async fn idle(&mut self) -> Phase {
        loop {
            tokio::select! {
                changed = self.config_rx.changed() => {
                    if changed.is_err() {
                        return self.shutdown(None).await;
                    }
                    self.config_rx.borrow_and_update();
                    if self.config.current().credentials().is_some() {
                        tracing::info!("Credentials configured, starting tracking");
                        return Phase::Starting;
                    }
                }
                cmd = self.rx.recv() => {
                    if let Flow::Shutdown = self.handle_command(cmd, TrackerState::Idle, None) {
                        return self.shutdown(None).await;
                    }
                }
            }
        }
    }

    fn start_session(&mut self) -> Phase {
        // Mark the snapshot as seen so only later edits restart the session.
        self.config_rx.borrow_and_update();
        let config = self.config.current();
        let Some(credentials) = config.credentials() else {
            self.collaborators.status().set_status(STATUS_INACTIVE);
            return Phase::Idle;
        };

        let timezone = config.reference_timezone();
        let params = SessionParams {
            credentials,
            output: config.output_path(),
            timezone,
            history_limit: config.history_limit,
        };

        self.collaborators
            .notifier
            .notify(NOTIFICATION_TITLE, "PNL Tracking Started");
        self.collaborators.status().set_status(STATUS_STARTING);

        let session = TrackingSession::new(self.collaborators.session.clone(), params);
        let accumulator = session.accumulator();
        let cancel = CancellationToken::new();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let task = tokio::spawn(session.run(cancel.clone(), outcome_tx));

        let until_midnight = until_next_midnight(Utc::now(), timezone);
        self.sessions_started += 1;
        tracing::info!(
            session = self.sessions_started,
            until_midnight = ?until_midnight,
            "Tracking session started"
        );

        Phase::Active(ActiveSession {
            cancel,
            task,
            outcome_rx,
            accumulator,
            midnight: Instant::now() + until_midnight,
        })
    }

    async fn active(&mut self, mut session: ActiveSession) -> Phase {
        loop {
            tokio::select! {
                () = sleep_until(session.midnight) => {
                    tracing::info!("Day boundary reached, restarting tracking");
                    stop_session(session).await;
                    self.collaborators.status().set_status(STATUS_INACTIVE);
                    return Phase::Starting;
                }
                changed = self.config_rx.changed() => {
                    if changed.is_err() {
                        return self.shutdown(Some(session)).await;
                    }
                    tracing::info!("Configuration changed, restarting tracking");
                    stop_session(session).await;
                    self.collaborators.status().set_status(STATUS_INACTIVE);
                    return Phase::Starting;
                }
                outcome = &mut session.outcome_rx => {
                    let outcome = outcome.unwrap_or_else(|_| SessionOutcome::Failed {
                        kind: FaultKind::Other,
                        message: "session ended without reporting".to_string(),
                    });
                    stop_session(session).await;
                    return self.handle_outcome(&outcome);
                }
                cmd = self.rx.recv() => {
                    if let Flow::Shutdown = self.handle_command(cmd, TrackerState::Active, session.pnl()) {
                        return self.shutdown(Some(session)).await;
                    }
                }
            }
        }
    }

    async fn backoff(&mut self, deadline: Instant) -> Phase {
        loop {
            tokio::select! {
                () = sleep_until(deadline) => {
                    tracing::info!("Backoff elapsed, retrying");
                    return Phase::Starting;
                }
                changed = self.config_rx.changed() => {
                    if changed.is_err() {
                        return self.shutdown(None).await;
                    }
                    tracing::info!("Configuration changed during backoff, retrying now");
                    return Phase::Starting;
                }
                cmd = self.rx.recv() => {
                    if let Flow::Shutdown = self.handle_command(cmd, TrackerState::Backoff, None) {
                        return self.shutdown(None).await;
                    }
                }
            }
        }
    }

    fn handle_outcome(&mut self, outcome: &SessionOutcome) -> Phase {
        let kind = outcome.fault_kind();
        self.last_fault = Some(kind);
        let status = self.collaborators.status();

        match kind {
            FaultKind::AuthenticationFailure => {
                tracing::error!(?outcome, "Authentication failed, clearing credentials");
                self.config.clear_credentials();
                self.collaborators
                    .notifier
                    .notify(NOTIFICATION_TITLE, "Authentication failed");
                status.set_status(STATUS_AUTH_ERROR);
                Phase::Idle
            }
            FaultKind::NetworkOrTimeout => {
                tracing::warn!(
                    ?outcome,
                    backoff = ?self.settings.backoff,
                    "Network failure, retrying after backoff"
                );
                self.collaborators
                    .notifier
                    .notify(NOTIFICATION_TITLE, "Network connection failed");
                status.set_status(STATUS_TIMEOUT_ERROR);
                Phase::Backoff(Instant::now() + self.settings.backoff)
            }
            FaultKind::ConnectionClosed => {
                tracing::info!("Connection closed, reconnecting");
                Phase::Starting
            }
            FaultKind::Other => {
                tracing::error!(?outcome, "Tracking session failed, restarting");
                status.set_status(STATUS_ERROR);
                Phase::Starting
            }
        }
    }

    fn handle_command(
        &self,
        cmd: Option<TrackerCommand>,
        state: TrackerState,
        pnl: Option<f64>,
    ) -> Flow {
        match cmd {
            Some(TrackerCommand::GetStatus(reply)) => {
                let status = TrackerStatus {
                    state,
                    pnl,
                    sessions_started: self.sessions_started,
                    last_fault: self.last_fault,
                    last_heartbeat: Utc::now(),
                };
                // Caller may have stopped waiting.
                let _ = reply.send(status);
                Flow::Continue
            }
            Some(TrackerCommand::Shutdown) => {
                tracing::info!("Shutdown requested");
                Flow::Shutdown
            }
            None => {
                tracing::info!("All tracker handles dropped, shutting down");
                Flow::Shutdown
            }
        }
    }

    async fn shutdown(&mut self, session: Option<ActiveSession>) -> Phase {
        if let Some(session) = session {
            stop_session(session).await;
        }
        self.collaborators.status().set_status(STATUS_EXITING);
        Phase::Terminal
    }
}

/// Cancels the session and waits until it has fully stopped.
async fn stop_session(session: ActiveSession) {
    session.cancel.cancel();
    if let Err(e) = session.task.await {
        if e.is_panic() {
            tracing::error!(error = %e, "Tracking session panicked");
        }
    }
}
