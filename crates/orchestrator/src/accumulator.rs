//! Running realized-`PnL` total for one tracking session.
//!
//! All mutations go through [`PnlAccumulator::apply_delta`], which holds the
//! lock for the whole read-modify-write, publishes the new status line and
//! queues a persistence write before releasing it. Writes are performed by a
//! per-accumulator writer task in the order they were queued, so a slow or
//! failing sink never stalls the stream. [`PnlAccumulator::close`] stops that
//! task; once it returns no write from this session can land.

use daily_pnl_core::{format_pnl, PersistenceSink, StatusSink};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Status line shown while a session is running.
#[must_use]
pub fn running_status(total: f64) -> String {
    format!("Running - Todays PnL {}", format_pnl(total))
}

/// Where and how the running total is persisted.
#[derive(Clone)]
pub struct PersistenceTarget {
    pub sink: Arc<dyn PersistenceSink>,
    pub path: PathBuf,
}

struct Writer {
    tx: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

pub struct PnlAccumulator {
    total: Mutex<f64>,
    status: Arc<dyn StatusSink>,
    writer: Mutex<Option<Writer>>,
}

impl PnlAccumulator {
    /// Creates the accumulator for a session, starting at `baseline`.
    ///
    /// When a persistence target is given a writer task is spawned on the
    /// current runtime. It runs until [`close`](Self::close) is called or the
    /// accumulator is dropped.
    #[must_use]
    pub fn initialize(
        baseline: f64,
        status: Arc<dyn StatusSink>,
        persistence: Option<PersistenceTarget>,
    ) -> Self {
        let writer = persistence.map(|target| {
            let (tx, rx) = mpsc::unbounded_channel();
            let task = tokio::spawn(run_writer(target, rx));
            Writer { tx, task }
        });

        Self {
            total: Mutex::new(baseline),
            status,
            writer: Mutex::new(writer),
        }
    }

    /// Adds `delta` to the total and returns the new value.
    pub fn apply_delta(&self, delta: f64) -> f64 {
        let mut total = self.total.lock();
        *total += delta;
        let new_total = *total;

        self.status.set_status(&running_status(new_total));
        if let Some(writer) = self.writer.lock().as_ref() {
            if writer.tx.send(format_pnl(new_total)).is_err() {
                tracing::warn!("PnL writer task has stopped, value not persisted");
            }
        }

        tracing::debug!(delta, pnl = new_total, "Applied realized PnL delta");
        new_total
    }

    /// Current total. Never waits on I/O.
    #[must_use]
    pub fn read(&self) -> f64 {
        *self.total.lock()
    }

    /// Stops the writer task, discarding writes still queued, and waits for
    /// it to finish. Later deltas still update the total and status but are
    /// not persisted.
    pub async fn close(&self) {
        let writer = self.writer.lock().take();
        let Some(Writer { tx, task }) = writer else {
            return;
        };
        drop(tx);
        task.abort();
        match task.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {
                tracing::debug!("Discarded pending PnL writes at session end");
            }
            Err(e) => tracing::warn!(error = %e, "PnL writer task failed"),
        }
    }
}

impl Drop for PnlAccumulator {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.get_mut().take() {
            writer.task.abort();
        }
    }
}

async fn run_writer(target: PersistenceTarget, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(text) = rx.recv().await {
        if let Err(e) = target.sink.write(&target.path, &text).await {
            tracing::warn!(
                path = %target.path.display(),
                error = %e,
                "Failed to save updated PnL"
            );
        }
    }
}
