use crate::signing::signed_headers;
use crate::types::{api_error, ApiResponse, HistoryPositions};
use crate::websocket::BitunixPositionStream;
use async_trait::async_trait;
use daily_pnl_core::{
    ClosedPosition, Credentials, ExchangeClient, ExchangeError, PositionStream, TrackingWindow,
};
use governor::{clock::DefaultClock, state::InMemoryState, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

pub const HISTORY_POSITIONS_PATH: &str = "/api/v1/futures/position/get_history_positions";
pub const ACCOUNT_PATH: &str = "/api/v1/futures/account";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

type DirectLimiter = RateLimiter<governor::state::direct::NotKeyed, InMemoryState, DefaultClock>;

/// Authenticated REST client for the Bitunix futures API.
pub struct BitunixClient {
    http_client: Client,
    base_url: String,
    ws_url: String,
    credentials: Credentials,
    rate_limiter: Arc<DirectLimiter>,
}

impl BitunixClient {
    /// Creates a client bound to `credentials`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        base_url: String,
        ws_url: String,
        credentials: Credentials,
    ) -> Result<Self, ExchangeError> {
        Self::with_timeout(base_url, ws_url, credentials, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom per-request timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn with_timeout(
        base_url: String,
        ws_url: String,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ExchangeError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExchangeError::Other(format!("failed to build HTTP client: {e}")))?;

        // 10 requests per second per key
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(nonzero!(10u32))));

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            ws_url,
            credentials,
            rate_limiter,
        })
    }

    /// Signed GET returning the `data` field of the response envelope.
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, ExchangeError> {
        self.rate_limiter.until_ready().await;

        let headers = signed_headers(
            &self.credentials.api_key,
            &self.credentials.secret,
            params,
            "",
        );
        let url = format!("{}{}", self.base_url, endpoint);

        tracing::debug!(endpoint, "Sending signed GET");
        let response = self
            .http_client
            .get(&url)
            .query(params)
            .header("api-key", headers.api_key)
            .header("nonce", headers.nonce)
            .header("timestamp", headers.timestamp)
            .header("sign", headers.sign)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ExchangeError::Authentication(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(ExchangeError::Api {
                code: i64::from(status.as_u16()),
                message: format!("HTTP {status}"),
            });
        }

        let body = response.text().await.map_err(map_reqwest_error)?;
        let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
        if envelope.code != 0 {
            return Err(api_error(envelope.code, &envelope.msg));
        }
        Ok(envelope.data)
    }
}

#[async_trait]
impl ExchangeClient for BitunixClient {
    async fn check_credentials(&self) -> Result<(), ExchangeError> {
        self.get::<serde_json::Value>(ACCOUNT_PATH, &[("marginCoin", "USDT".to_string())])
            .await?;
        Ok(())
    }

    async fn closed_positions(
        &self,
        window: &TrackingWindow,
        limit: u32,
    ) -> Result<Vec<ClosedPosition>, ExchangeError> {
        let params = [
            ("startTime", window.start.timestamp_millis().to_string()),
            ("endTime", window.end.timestamp_millis().to_string()),
            ("limit", limit.to_string()),
        ];

        let data: Option<HistoryPositions> = self.get(HISTORY_POSITIONS_PATH, &params).await?;
        let positions: Vec<ClosedPosition> = data
            .map(|d| d.positions)
            .unwrap_or_default()
            .into_iter()
            .map(ClosedPosition::from)
            .collect();

        if positions.len() >= limit as usize {
            tracing::warn!(
                limit,
                "History query returned a full page, baseline may be incomplete"
            );
        }
        Ok(positions)
    }

    async fn subscribe_positions(&self) -> Result<Box<dyn PositionStream>, ExchangeError> {
        let stream = BitunixPositionStream::connect(&self.ws_url, &self.credentials).await?;
        Ok(Box::new(stream))
    }
}

/// Maps transport errors to the typed categories.
#[must_use]
pub fn map_reqwest_error(e: reqwest::Error) -> ExchangeError {
    if e.is_timeout() {
        ExchangeError::Timeout(e.to_string())
    } else if e.is_connect() || e.is_request() {
        ExchangeError::Network(e.to_string())
    } else if e.is_decode() || e.is_body() {
        ExchangeError::Decode(e.to_string())
    } else {
        ExchangeError::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds() -> Credentials {
        Credentials::new("test-key".to_string(), "test-secret".to_string())
    }

    fn client(server: &MockServer) -> BitunixClient {
        BitunixClient::new(server.uri(), "ws://127.0.0.1:1".to_string(), creds()).unwrap()
    }

    fn window() -> TrackingWindow {
        let now = DateTime::parse_from_rfc3339("2024-01-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        TrackingWindow::containing(now, chrono_tz::Europe::Berlin)
    }

    #[tokio::test]
    async fn closed_positions_sends_signed_window_query() {
        let server = MockServer::start().await;
        let w = window();

        Mock::given(method("GET"))
            .and(path(HISTORY_POSITIONS_PATH))
            .and(query_param("startTime", w.start.timestamp_millis().to_string()))
            .and(query_param("endTime", w.end.timestamp_millis().to_string()))
            .and(query_param("limit", "100"))
            .and(header_exists("api-key"))
            .and(header_exists("nonce"))
            .and(header_exists("timestamp"))
            .and(header_exists("sign"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "Success",
                "data": {
                    "positionList": [
                        {"positionId": "1", "symbol": "BTCUSDT", "realizedPNL": "10.00"},
                        {"positionId": "2", "symbol": "ETHUSDT", "realizedPNL": "-2.50"}
                    ],
                    "total": 2
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let positions = client(&server).closed_positions(&w, 100).await.unwrap();
        let total: f64 = positions.iter().map(|p| p.realized_pnl).sum();

        assert_eq!(positions.len(), 2);
        assert!((total - 7.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_data_is_an_empty_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HISTORY_POSITIONS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0, "msg": "Success", "data": null
            })))
            .mount(&server)
            .await;

        let positions = client(&server).closed_positions(&window(), 100).await.unwrap();
        assert!(positions.is_empty());
    }

    #[tokio::test]
    async fn auth_error_code_maps_to_authentication() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ACCOUNT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 10003, "msg": "api-key can't be empty"
            })))
            .mount(&server)
            .await;

        let err = client(&server).check_credentials().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Authentication(_)));
    }

    #[tokio::test]
    async fn signature_error_code_maps_to_signature() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ACCOUNT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 10007, "msg": "sign signature error"
            })))
            .mount(&server)
            .await;

        let err = client(&server).check_credentials().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Signature(_)));
    }

    #[tokio::test]
    async fn http_401_maps_to_authentication() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).check_credentials().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Authentication(_)));
    }

    #[tokio::test]
    async fn slow_response_maps_to_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"code": 0, "msg": "ok", "data": {}}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = BitunixClient::with_timeout(
            server.uri(),
            "ws://127.0.0.1:1".to_string(),
            creds(),
            Duration::from_millis(50),
        )
        .unwrap();

        let err = client.check_credentials().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Timeout(_)));
    }

    #[tokio::test]
    async fn unreachable_host_maps_to_network() {
        // Port 1 on localhost is closed.
        let client = BitunixClient::new(
            "http://127.0.0.1:1".to_string(),
            "ws://127.0.0.1:1".to_string(),
            creds(),
        )
        .unwrap();

        let err = client.check_credentials().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Network(_)));
    }
}
