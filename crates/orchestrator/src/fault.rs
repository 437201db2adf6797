use daily_pnl_core::{ExchangeError, FaultKind};

/// Maps any exchange client failure to the fault class the orchestrator
/// acts on. Total and side-effect free; only the typed category is used.
#[must_use]
pub const fn classify(error: &ExchangeError) -> FaultKind {
    match error {
        ExchangeError::Authentication(_) | ExchangeError::Signature(_) => {
            FaultKind::AuthenticationFailure
        }
        ExchangeError::Network(_) | ExchangeError::Timeout(_) => FaultKind::NetworkOrTimeout,
        ExchangeError::ConnectionClosed => FaultKind::ConnectionClosed,
        ExchangeError::Api { .. } | ExchangeError::Decode(_) | ExchangeError::Other(_) => {
            FaultKind::Other
        }
    }
}
