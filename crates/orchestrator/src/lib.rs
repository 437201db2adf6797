pub mod accumulator;
pub mod commands;
pub mod fault;
pub mod handle;
pub mod orchestrator;
pub mod session;
pub mod sinks;

pub use accumulator::{running_status, PersistenceTarget, PnlAccumulator};
pub use commands::{TrackerCommand, TrackerState, TrackerStatus};
pub use fault::classify;
pub use handle::TrackerHandle;
pub use orchestrator::{Collaborators, Orchestrator, OrchestratorSettings, NOTIFICATION_TITLE};
pub use session::{SessionContext, SessionParams, TrackingSession};
pub use sinks::{FilePersistence, LogNotifier, StatusBoard};
