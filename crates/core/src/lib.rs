pub mod config;
pub mod config_loader;
pub mod config_store;
pub mod config_watcher;
pub mod errors;
pub mod events;
pub mod traits;
pub mod window;

pub use config::{Credentials, TrackerConfig};
pub use config_loader::{ConfigError, ConfigLoader};
pub use config_store::ConfigStore;
pub use config_watcher::ConfigWatcher;
pub use errors::ExchangeError;
pub use events::{ClosedPosition, FaultKind, PositionEvent, PositionEventKind, SessionOutcome};
pub use traits::{
    ExchangeClient, ExchangeConnector, Notifier, PersistenceError, PersistenceSink,
    PositionStream, StatusSink,
};
pub use window::TrackingWindow;

/// Formats a `PnL` value the way it is displayed and persisted.
#[must_use]
pub fn format_pnl(value: f64) -> String {
    format!("{value:.2}")
}
