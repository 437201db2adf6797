#![allow(dead_code)]

use async_trait::async_trait;
use daily_pnl_core::{
    ClosedPosition, Credentials, ExchangeClient, ExchangeConnector, ExchangeError, Notifier,
    PersistenceError, PersistenceSink, PositionEvent, PositionEventKind, PositionStream,
    StatusSink, TrackingWindow,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub type EventTx = mpsc::UnboundedSender<Result<PositionEvent, ExchangeError>>;
type EventRx = mpsc::UnboundedReceiver<Result<PositionEvent, ExchangeError>>;

/// What the next `connect` call does.
pub enum Script {
    ConnectFails(ExchangeError),
    HistoryFails(ExchangeError),
    /// Baseline positions, then the stream fed by the paired [`EventTx`].
    /// Dropping the sender ends the stream cleanly.
    Stream {
        baseline: Vec<f64>,
        events: EventRx,
        closed: Arc<AtomicBool>,
    },
}

impl Script {
    pub fn stream(baseline: Vec<f64>) -> (Self, EventTx, Arc<AtomicBool>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let script = Self::Stream {
            baseline,
            events: rx,
            closed: closed.clone(),
        };
        (script, tx, closed)
    }
}

#[derive(Debug, Clone)]
pub struct ConnectRecord {
    pub at: Instant,
    pub credentials: Credentials,
}

/// Connector that replays scripted sessions. Once the scripts run out every
/// session gets an empty baseline and a stream that stays open.
pub struct FakeConnector {
    scripts: Mutex<VecDeque<Script>>,
    connects: mpsc::UnboundedSender<ConnectRecord>,
    keepalive: Mutex<Vec<EventTx>>,
}

impl FakeConnector {
    pub fn new(scripts: Vec<Script>) -> (Arc<Self>, mpsc::UnboundedReceiver<ConnectRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            connects: tx,
            keepalive: Mutex::new(Vec::new()),
        });
        (connector, rx)
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().push_back(script);
    }
}

#[async_trait]
impl ExchangeConnector for FakeConnector {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn ExchangeClient>, ExchangeError> {
        let _ = self.connects.send(ConnectRecord {
            at: Instant::now(),
            credentials: credentials.clone(),
        });

        let next = self.scripts.lock().pop_front();
        let script = next.unwrap_or_else(|| {
            let (script, tx, _) = Script::stream(Vec::new());
            self.keepalive.lock().push(tx);
            script
        });

        match script {
            Script::ConnectFails(e) => Err(e),
            Script::HistoryFails(e) => Ok(Box::new(FakeClient {
                history: Err(e),
                stream: Mutex::new(None),
            })),
            Script::Stream {
                baseline,
                events,
                closed,
            } => Ok(Box::new(FakeClient {
                history: Ok(baseline),
                stream: Mutex::new(Some(FakeStream { events, closed })),
            })),
        }
    }
}

struct FakeClient {
    history: Result<Vec<f64>, ExchangeError>,
    stream: Mutex<Option<FakeStream>>,
}

#[async_trait]
impl ExchangeClient for FakeClient {
    async fn check_credentials(&self) -> Result<(), ExchangeError> {
        Ok(())
    }

    async fn closed_positions(
        &self,
        _window: &TrackingWindow,
        limit: u32,
    ) -> Result<Vec<ClosedPosition>, ExchangeError> {
        let values = self.history.clone()?;
        Ok(values
            .into_iter()
            .take(limit as usize)
            .enumerate()
            .map(|(i, realized_pnl)| ClosedPosition {
                position_id: format!("hist-{i}"),
                symbol: "BTCUSDT".to_string(),
                realized_pnl,
            })
            .collect())
    }

    async fn subscribe_positions(&self) -> Result<Box<dyn PositionStream>, ExchangeError> {
        self.stream
            .lock()
            .take()
            .map(|s| Box::new(s) as Box<dyn PositionStream>)
            .ok_or_else(|| ExchangeError::Other("already subscribed".to_string()))
    }
}

struct FakeStream {
    events: EventRx,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl PositionStream for FakeStream {
    async fn next_event(&mut self) -> Option<Result<PositionEvent, ExchangeError>> {
        self.events.recv().await
    }

    async fn close(&mut self) -> Result<(), ExchangeError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub fn close_event(id: &str, realized_pnl: f64) -> PositionEvent {
    event(PositionEventKind::Close, id, realized_pnl)
}

pub fn event(kind: PositionEventKind, id: &str, realized_pnl: f64) -> PositionEvent {
    PositionEvent {
        kind,
        position_id: id.to_string(),
        symbol: "BTCUSDT".to_string(),
        realized_pnl,
    }
}

#[derive(Default)]
pub struct RecordingStatus {
    lines: Mutex<Vec<String>>,
}

impl RecordingStatus {
    pub fn last(&self) -> Option<String> {
        self.lines.lock().last().cloned()
    }

    pub fn all(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl StatusSink for RecordingStatus {
    fn set_status(&self, text: &str) {
        self.lines.lock().push(text.to_string());
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    bodies: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, _title: &str, body: &str) {
        self.bodies.lock().push(body.to_string());
    }
}

/// Persistence sink that keeps every write in memory, optionally taking
/// `delay` to complete each one.
#[derive(Default)]
pub struct MemoryPersistence {
    writes: Mutex<Vec<(PathBuf, String)>>,
    delay: Duration,
}

impl MemoryPersistence {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            writes: Mutex::default(),
            delay,
        }
    }

    pub fn values(&self) -> Vec<String> {
        self.writes.lock().iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn last(&self) -> Option<String> {
        self.writes.lock().last().map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl PersistenceSink for MemoryPersistence {
    async fn write(&self, path: &Path, text: &str) -> Result<(), PersistenceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.writes.lock().push((path.to_path_buf(), text.to_string()));
        Ok(())
    }
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually(what: &str, check: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn next_connect(rx: &mut mpsc::UnboundedReceiver<ConnectRecord>) -> ConnectRecord {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a connect")
        .expect("connector dropped")
}

/// Asserts no connect happens within `window`.
pub async fn no_connect_within(rx: &mut mpsc::UnboundedReceiver<ConnectRecord>, window: Duration) {
    if let Ok(Some(record)) = tokio::time::timeout(window, rx.recv()).await {
        panic!("unexpected connect with key {}", record.credentials.api_key);
    }
}

pub fn credentials(key: &str) -> Credentials {
    Credentials::new(key.to_string(), format!("{key}-secret"))
}
