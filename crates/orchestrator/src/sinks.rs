use async_trait::async_trait;
use daily_pnl_core::{Notifier, PersistenceError, PersistenceSink, StatusSink};
use std::path::{Path, PathBuf};
use tokio::sync::watch;

/// File written inside a configured output folder.
pub const PNL_FILE_NAME: &str = "pnl.txt";

/// Status sink backed by a `watch` channel; readers see the latest line.
pub struct StatusBoard {
    tx: watch::Sender<String>,
}

impl StatusBoard {
    #[must_use]
    pub fn new(initial: &str) -> Self {
        let (tx, _rx) = watch::channel(initial.to_string());
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> String {
        self.tx.borrow().clone()
    }
}

impl StatusSink for StatusBoard {
    fn set_status(&self, text: &str) {
        self.tx.send_replace(text.to_string());
    }
}

/// Notifier that records alerts in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        tracing::info!(title, body, "Notification");
    }
}

/// Writes the running total as plain text, overwriting in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilePersistence;

impl FilePersistence {
    /// Resolves the file actually written for a configured location.
    ///
    /// An existing directory, or a path without an extension, names a
    /// folder and the value goes to `pnl.txt` inside it. Anything else is
    /// the file itself.
    #[must_use]
    pub fn resolve(path: &Path) -> PathBuf {
        if path.is_dir() || (!path.is_file() && path.extension().is_none()) {
            path.join(PNL_FILE_NAME)
        } else {
            path.to_path_buf()
        }
    }
}

#[async_trait]
impl PersistenceSink for FilePersistence {
    async fn write(&self, path: &Path, text: &str) -> Result<(), PersistenceError> {
        if path.as_os_str().is_empty() {
            return Err(PersistenceError::EmptyPath);
        }

        let file = Self::resolve(path);
        let io_err = |source| PersistenceError::Io {
            path: file.display().to_string(),
            source,
        };

        if let Some(parent) = file.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
            }
        }
        tokio::fs::write(&file, text).await.map_err(io_err)?;

        tracing::debug!(path = %file.display(), value = text, "Saved PnL to file");
        Ok(())
    }
}
