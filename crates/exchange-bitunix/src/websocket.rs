use crate::signing::{generate_nonce, sign_login};
use crate::types::{api_error, PositionPush};
use async_trait::async_trait;
use daily_pnl_core::{Credentials, ExchangeError, PositionEvent, PositionStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{interval, timeout, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);
const PING_INTERVAL: Duration = Duration::from_secs(20);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Private Bitunix WebSocket subscribed to the `position` channel.
pub struct BitunixPositionStream {
    stream: WsStream,
    ping: Interval,
    pending: VecDeque<PositionEvent>,
    closed: bool,
}

impl BitunixPositionStream {
    /// Connects, logs in and subscribes to position pushes.
    ///
    /// # Errors
    /// Returns error if the connection fails, login is rejected or the
    /// subscription cannot be sent
    pub async fn connect(ws_url: &str, credentials: &Credentials) -> Result<Self, ExchangeError> {
        tracing::debug!(url = ws_url, "Connecting private WebSocket");

        let (stream, response) = timeout(CONNECT_TIMEOUT, connect_async(ws_url))
            .await
            .map_err(|_| ExchangeError::Timeout(format!("connecting to {ws_url}")))?
            .map_err(map_ws_error)?;

        tracing::info!(status = %response.status(), "Private WebSocket connected");

        let mut ping = interval(PING_INTERVAL);
        ping.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ping.reset();

        let mut this = Self {
            stream,
            ping,
            pending: VecDeque::new(),
            closed: false,
        };

        this.login(credentials).await?;
        this.send_json(&serde_json::json!({
            "op": "subscribe",
            "args": [{"ch": "position"}]
        }))
        .await?;
        tracing::info!("Subscribed to position channel");

        Ok(this)
    }

    async fn login(&mut self, credentials: &Credentials) -> Result<(), ExchangeError> {
        let nonce = generate_nonce();
        let timestamp = chrono::Utc::now().timestamp();
        let sign = sign_login(&credentials.api_key, &credentials.secret, &nonce, timestamp);

        self.send_json(&serde_json::json!({
            "op": "login",
            "args": [{
                "apiKey": credentials.api_key,
                "timestamp": timestamp,
                "nonce": nonce,
                "sign": sign,
            }]
        }))
        .await?;

        timeout(LOGIN_TIMEOUT, self.await_login_ack())
            .await
            .map_err(|_| ExchangeError::Timeout("waiting for login response".to_string()))?
    }

    async fn await_login_ack(&mut self) -> Result<(), ExchangeError> {
        while let Some(msg) = self.stream.next().await {
            let Message::Text(text) = msg.map_err(map_ws_error)? else {
                continue;
            };
            let json: serde_json::Value = serde_json::from_str(&text)?;
            if json.get("op").and_then(|v| v.as_str()) != Some("login") {
                continue;
            }

            if let Some(code) = json.get("code").and_then(serde_json::Value::as_i64) {
                if code != 0 {
                    let msg = json.get("msg").and_then(|v| v.as_str()).unwrap_or_default();
                    return Err(login_error(code, msg));
                }
            }

            let accepted = json
                .pointer("/data/result")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            return if accepted {
                tracing::debug!("WebSocket login accepted");
                Ok(())
            } else {
                Err(ExchangeError::Authentication("login rejected".to_string()))
            };
        }
        Err(ExchangeError::ConnectionClosed)
    }

    async fn send_json(&mut self, value: &serde_json::Value) -> Result<(), ExchangeError> {
        self.stream
            .send(Message::Text(value.to_string()))
            .await
            .map_err(map_ws_error)
    }

    fn handle_text(&mut self, text: &str) -> Result<(), ExchangeError> {
        self.pending.extend(parse_position_frame(text)?);
        Ok(())
    }

    async fn send_ping(&mut self) -> Result<(), ExchangeError> {
        let ping = serde_json::json!({"op": "ping", "ping": chrono::Utc::now().timestamp()});
        self.send_json(&ping).await?;
        tracing::trace!("Sent ping to server");
        Ok(())
    }
}

#[async_trait]
impl PositionStream for BitunixPositionStream {
    async fn next_event(&mut self) -> Option<Result<PositionEvent, ExchangeError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.closed {
                return None;
            }

            tokio::select! {
                _ = self.ping.tick() => {
                    if let Err(e) = self.send_ping().await {
                        return Some(Err(e));
                    }
                }
                msg = self.stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = self.handle_text(&text) {
                            tracing::warn!(error = %e, "Failed to parse position message");
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = self.stream.send(Message::Pong(data)).await {
                            return Some(Err(map_ws_error(e)));
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(frame = ?frame, "Received close frame");
                        self.closed = true;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        self.closed = true;
                        return Some(Err(map_ws_error(e)));
                    }
                    None => {
                        self.closed = true;
                    }
                },
            }
        }
    }

    async fn close(&mut self) -> Result<(), ExchangeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.stream.close(None).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(map_ws_error(e)),
        }
    }
}

fn login_error(code: i64, msg: &str) -> ExchangeError {
    match api_error(code, msg) {
        e @ (ExchangeError::Authentication(_) | ExchangeError::Signature(_)) => e,
        _ => ExchangeError::Authentication(format!("login failed with code {code}: {msg}")),
    }
}

/// Maps WebSocket transport errors to the typed categories.
#[must_use]
/// Extracts the position events carried by one text frame.
///
/// Frames from other channels yield nothing. Items that fail to decode are
/// logged and skipped so one malformed entry does not drop its siblings.
///
/// # Errors
/// Returns an error only if the frame itself is not valid JSON.
pub fn parse_position_frame(text: &str) -> Result<Vec<PositionEvent>, ExchangeError> {
    let json: serde_json::Value = serde_json::from_str(text)?;

    if json.get("ch").and_then(|v| v.as_str()) != Some("position") {
        tracing::trace!(message = text, "Ignoring non-position message");
        return Ok(Vec::new());
    }

    let items: Vec<&serde_json::Value> = match json.get("data") {
        Some(serde_json::Value::Array(items)) => items.iter().collect(),
        Some(data @ serde_json::Value::Object(_)) => vec![data],
        _ => Vec::new(),
    };

    let mut events = Vec::with_capacity(items.len());
    for item in items {
        match PositionPush::deserialize(item) {
            Ok(push) => events.push(push.into()),
            Err(e) => tracing::warn!(error = %e, item = %item, "Skipping malformed position push"),
        }
    }
    Ok(events)
}

pub fn map_ws_error(e: tungstenite::Error) -> ExchangeError {
    match e {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            ExchangeError::ConnectionClosed
        }
        tungstenite::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            ExchangeError::Timeout(io.to_string())
        }
        tungstenite::Error::Io(io) => ExchangeError::Network(io.to_string()),
        tungstenite::Error::Http(response)
            if response.status() == 401 || response.status() == 403 =>
        {
            ExchangeError::Authentication(format!("HTTP {}", response.status()))
        }
        tungstenite::Error::Protocol(p) => ExchangeError::Network(p.to_string()),
        other => ExchangeError::Other(other.to_string()),
    }
}
