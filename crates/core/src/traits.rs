use crate::config::Credentials;
use crate::errors::ExchangeError;
use crate::events::{ClosedPosition, PositionEvent};
use crate::window::TrackingWindow;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Builds exchange clients bound to a set of credentials.
#[async_trait]
pub trait ExchangeConnector: Send + Sync {
    async fn connect(&self, credentials: &Credentials)
        -> Result<Box<dyn ExchangeClient>, ExchangeError>;
}

#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Cheap authenticated call used to validate credentials.
    async fn check_credentials(&self) -> Result<(), ExchangeError>;

    /// Positions closed inside `window`, at most `limit` of them.
    async fn closed_positions(
        &self,
        window: &TrackingWindow,
        limit: u32,
    ) -> Result<Vec<ClosedPosition>, ExchangeError>;

    /// Opens the authenticated live subscription for position events.
    async fn subscribe_positions(&self) -> Result<Box<dyn PositionStream>, ExchangeError>;
}

#[async_trait]
pub trait PositionStream: Send {
    /// Next delivered event. `None` means the stream ended without error.
    ///
    /// Must be cancel safe: dropping the future loses no delivered event.
    async fn next_event(&mut self) -> Option<Result<PositionEvent, ExchangeError>>;

    /// Closes the subscription through the exchange's own close path.
    async fn close(&mut self) -> Result<(), ExchangeError>;
}

/// Short human-readable status line (tray title, terminal line, ...).
pub trait StatusSink: Send + Sync {
    fn set_status(&self, text: &str);
}

/// Fire-and-forget user alert. Implementations log their own failures.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("output path is empty")]
    EmptyPath,

    #[error("IO error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Durable destination for the running total.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn write(&self, path: &Path, text: &str) -> Result<(), PersistenceError>;
}
