use crate::config::TrackerConfig;
use crate::config_loader::{ConfigError, ConfigLoader};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Owner of the live tracker configuration.
///
/// Readers take snapshots with [`ConfigStore::current`] and wait for saves
/// through [`ConfigStore::subscribe`]. Cloning shares the same state.
#[derive(Clone)]
pub struct ConfigStore {
    tx: Arc<watch::Sender<TrackerConfig>>,
    path: Option<PathBuf>,
}

impl ConfigStore {
    /// Creates an in-memory store that is never written to disk.
    #[must_use]
    pub fn new(initial: TrackerConfig) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx: Arc::new(tx),
            path: None,
        }
    }

    /// Creates a store backed by the given config file.
    #[must_use]
    pub fn with_path(initial: TrackerConfig, path: PathBuf) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx: Arc::new(tx),
            path: Some(path),
        }
    }

    #[must_use]
    pub fn current(&self) -> TrackerConfig {
        self.tx.borrow().clone()
    }

    /// Returns a receiver that wakes once per effective configuration change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TrackerConfig> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Publishes a new configuration. Returns `false` (and notifies nobody)
    /// when it equals the current one.
    pub fn replace(&self, config: TrackerConfig) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == config {
                false
            } else {
                *current = config;
                true
            }
        })
    }

    /// Empties the stored API key and secret without notifying subscribers.
    ///
    /// The tracker calls this after an authentication failure so it stays
    /// idle until new credentials are saved.
    pub fn clear_credentials(&self) {
        self.tx.send_if_modified(|current| {
            current.api_key.clear();
            current.secret_key.clear();
            false
        });
    }

    /// Writes the current configuration to the backing file, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<(), ConfigError> {
        match &self.path {
            Some(path) => ConfigLoader::save(path, &self.current()),
            None => Ok(()),
        }
    }
}
