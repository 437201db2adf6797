use crate::commands::{TrackerCommand, TrackerState, TrackerStatus};
use anyhow::Result;
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable handle to a running orchestrator. Once every handle is
/// dropped the orchestrator shuts down.
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<TrackerCommand>,
    state_rx: watch::Receiver<TrackerState>,
}

impl TrackerHandle {
    #[must_use]
    pub const fn new(tx: mpsc::Sender<TrackerCommand>, state_rx: watch::Receiver<TrackerState>) -> Self {
        Self { tx, state_rx }
    }

    /// Gets the current status of the tracker.
    ///
    /// # Errors
    /// Returns an error if the command cannot be sent or the response cannot be received.
    pub async fn status(&self) -> Result<TrackerStatus> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(TrackerCommand::GetStatus(tx)).await?;
        let status = rx.await?;
        Ok(status)
    }

    /// Requests shutdown. The orchestrator stops any active session and
    /// reaches [`TrackerState::Terminal`].
    ///
    /// # Errors
    /// Returns an error if the command cannot be sent to the orchestrator.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx.send(TrackerCommand::Shutdown).await?;
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> TrackerState {
        *self.state_rx.borrow()
    }

    /// Receiver for state transitions.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<TrackerState> {
        self.state_rx.clone()
    }
}
