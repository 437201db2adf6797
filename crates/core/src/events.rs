use serde::{Deserialize, Serialize};
use std::fmt;

/// A position closed earlier in the tracking window, as returned by the
/// history query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub position_id: String,
    pub symbol: String,
    pub realized_pnl: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionEventKind {
    Open,
    Update,
    Close,
    /// Any event type the exchange adds later.
    Unknown,
}

/// One message from the live position subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEvent {
    pub kind: PositionEventKind,
    pub position_id: String,
    pub symbol: String,
    /// Realized `PnL` attributed to this event; only meaningful for `Close`.
    pub realized_pnl: f64,
}

impl PositionEvent {
    #[must_use]
    pub fn is_close(&self) -> bool {
        self.kind == PositionEventKind::Close
    }
}

/// Closed set of failure classes the orchestrator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    /// Bad key or signature. Permanent until credentials are replaced.
    AuthenticationFailure,
    /// Transient transport failure. Retried after a fixed backoff.
    NetworkOrTimeout,
    /// The stream closed gracefully. Retried immediately.
    ConnectionClosed,
    Other,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AuthenticationFailure => "authentication failure",
            Self::NetworkOrTimeout => "network or timeout",
            Self::ConnectionClosed => "connection closed",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Terminal report of a tracking session. Sent at most once; a cancelled
/// session reports nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Failed { kind: FaultKind, message: String },
    /// The live stream ended without an error.
    StreamEnded,
}

impl SessionOutcome {
    /// Fault class the orchestrator acts on. A clean end counts as
    /// [`FaultKind::ConnectionClosed`].
    #[must_use]
    pub const fn fault_kind(&self) -> FaultKind {
        match self {
            Self::Failed { kind, .. } => *kind,
            Self::StreamEnded => FaultKind::ConnectionClosed,
        }
    }
}
