use crate::config_loader::ConfigLoader;
use crate::config_store::ConfigStore;
use anyhow::{Context, Result};
use notify::{Event, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Reloads the config file into a [`ConfigStore`] whenever it is saved.
pub struct ConfigWatcher {
    store: ConfigStore,
}

impl ConfigWatcher {
    #[must_use]
    pub const fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    /// Watches the configuration file and publishes every effective change.
    ///
    /// The parent directory is watched rather than the file itself so saves
    /// that replace the file are still seen. Runs until the task is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if file watching cannot be initiated.
    pub async fn watch(&self, config_path: &Path) -> Result<()> {
        let config_path = config_path.to_path_buf();
        let dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory {}", dir.display()))?;

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = event_tx.send(event);
            }
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %config_path.display(), "Watching config file for changes");

        while let Some(event) = event_rx.recv().await {
            if !Self::is_relevant(&event, &config_path) {
                continue;
            }

            match ConfigLoader::load(&config_path) {
                Ok(new_config) => {
                    if self.store.replace(new_config) {
                        tracing::info!("Config file changed, reloaded");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to reload config");
                }
            }
        }

        Ok(())
    }

    fn is_relevant(event: &Event, config_path: &Path) -> bool {
        (event.kind.is_modify() || event.kind.is_create())
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == config_path.file_name())
    }
}
