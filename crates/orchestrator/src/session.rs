use crate::accumulator::{running_status, PersistenceTarget, PnlAccumulator};
use crate::fault::classify;
use chrono::Utc;
use chrono_tz::Tz;
use daily_pnl_core::{
    format_pnl, Credentials, ExchangeConnector, ExchangeError, PersistenceSink, PositionStream,
    SessionOutcome, StatusSink, TrackingWindow,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Collaborators a session talks to.
#[derive(Clone)]
pub struct SessionContext {
    pub connector: Arc<dyn ExchangeConnector>,
    pub status: Arc<dyn StatusSink>,
    pub persistence: Arc<dyn PersistenceSink>,
}

/// Per-session inputs, snapshotted from the config when the session starts.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub credentials: Credentials,
    pub output: Option<PathBuf>,
    pub timezone: Tz,
    pub history_limit: u32,
}

/// How a session's work ended when no fault occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Cancelled,
    StreamEnded,
}

/// One attempt at tracking today's realized `PnL`: baseline query, then the
/// live stream until cancelled or the stream terminates.
pub struct TrackingSession {
    ctx: SessionContext,
    params: SessionParams,
    accumulator: Arc<OnceLock<Arc<PnlAccumulator>>>,
}

impl TrackingSession {
    #[must_use]
    pub fn new(ctx: SessionContext, params: SessionParams) -> Self {
        Self {
            ctx,
            params,
            accumulator: Arc::new(OnceLock::new()),
        }
    }

    /// Read-only view of the session's accumulator, filled once the
    /// baseline is known.
    #[must_use]
    pub fn accumulator(&self) -> Arc<OnceLock<Arc<PnlAccumulator>>> {
        self.accumulator.clone()
    }

    /// Runs the session and reports its outcome at most once.
    ///
    /// A session stopped through `cancel` reports nothing. The accumulator's
    /// writer is stopped before this returns on every path.
    pub async fn run(self, cancel: CancellationToken, outcome_tx: oneshot::Sender<SessionOutcome>) {
        let result = self.track(&cancel).await;
        if let Some(accumulator) = self.accumulator.get() {
            accumulator.close().await;
        }

        let outcome = match result {
            Ok(SessionEnd::Cancelled) => {
                tracing::debug!("Tracking session cancelled");
                return;
            }
            Ok(SessionEnd::StreamEnded) => {
                tracing::info!("Position stream ended");
                SessionOutcome::StreamEnded
            }
            Err(e) => {
                let kind = classify(&e);
                tracing::error!(error = %e, fault = %kind, "Tracking session failed");
                SessionOutcome::Failed {
                    kind,
                    message: e.to_string(),
                }
            }
        };

        if outcome_tx.send(outcome).is_err() {
            tracing::debug!("Orchestrator no longer waiting for session outcome");
        }
    }

    async fn track(&self, cancel: &CancellationToken) -> Result<SessionEnd, ExchangeError> {
        let Some(client) = or_cancel(cancel, self.ctx.connector.connect(&self.params.credentials))
            .await
            .transpose()?
        else {
            return Ok(SessionEnd::Cancelled);
        };

        let window = TrackingWindow::containing(Utc::now(), self.params.timezone);
        tracing::debug!(start = %window.start, end = %window.end, "Resolved tracking window");

        let Some(positions) = or_cancel(
            cancel,
            client.closed_positions(&window, self.params.history_limit),
        )
        .await
        .transpose()?
        else {
            return Ok(SessionEnd::Cancelled);
        };
        let baseline: f64 = positions.iter().map(|p| p.realized_pnl).sum();
        tracing::info!(
            positions = positions.len(),
            pnl = %format_pnl(baseline),
            "Initial realized PnL for today"
        );

        let target = self.params.output.clone().map(|path| PersistenceTarget {
            sink: self.ctx.persistence.clone(),
            path,
        });
        let accumulator = Arc::new(PnlAccumulator::initialize(
            baseline,
            self.ctx.status.clone(),
            target.clone(),
        ));
        let _ = self.accumulator.set(accumulator.clone());

        if let Some(target) = &target {
            let text = format_pnl(baseline);
            match or_cancel(cancel, target.sink.write(&target.path, &text)).await {
                None => return Ok(SessionEnd::Cancelled),
                Some(Err(e)) => tracing::warn!(error = %e, "Failed to save initial PnL"),
                Some(Ok(())) => {}
            }
        }
        self.ctx.status.set_status(&running_status(baseline));

        let Some(mut stream) = or_cancel(cancel, client.subscribe_positions())
            .await
            .transpose()?
        else {
            return Ok(SessionEnd::Cancelled);
        };

        self.stream_loop(cancel, stream.as_mut(), &accumulator).await
    }

    async fn stream_loop(
        &self,
        cancel: &CancellationToken,
        stream: &mut dyn PositionStream,
        accumulator: &PnlAccumulator,
    ) -> Result<SessionEnd, ExchangeError> {
        loop {
            if cancel.is_cancelled() {
                close_stream(stream).await;
                return Ok(SessionEnd::Cancelled);
            }

            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    close_stream(stream).await;
                    return Ok(SessionEnd::Cancelled);
                }

                next = stream.next_event() => match next {
                    None => {
                        close_stream(stream).await;
                        return Ok(SessionEnd::StreamEnded);
                    }
                    Some(Err(e)) => {
                        close_stream(stream).await;
                        return Err(e);
                    }
                    Some(Ok(event)) if event.is_close() => {
                        tracing::debug!(
                            position = %event.position_id,
                            symbol = %event.symbol,
                            realized_pnl = event.realized_pnl,
                            "Position closed"
                        );
                        accumulator.apply_delta(event.realized_pnl);
                    }
                    Some(Ok(event)) => {
                        tracing::trace!(kind = ?event.kind, "Ignoring non-close position event");
                    }
                },
            }
        }
    }
}

async fn close_stream(stream: &mut dyn PositionStream) {
    if let Err(e) = stream.close().await {
        tracing::warn!(error = %e, "Failed to close position stream");
    }
}

/// Runs `fut` unless `cancel` fires first.
async fn or_cancel<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}
