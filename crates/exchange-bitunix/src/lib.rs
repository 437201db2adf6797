pub mod client;
pub mod signing;
pub mod types;
pub mod websocket;

pub use client::BitunixClient;
pub use websocket::BitunixPositionStream;

use async_trait::async_trait;
use daily_pnl_core::{Credentials, ExchangeClient, ExchangeConnector, ExchangeError};

/// Creates [`BitunixClient`]s for the configured endpoints.
#[derive(Debug, Clone)]
pub struct BitunixConnector {
    api_url: String,
    ws_url: String,
}

impl BitunixConnector {
    #[must_use]
    pub const fn new(api_url: String, ws_url: String) -> Self {
        Self { api_url, ws_url }
    }
}

#[async_trait]
impl ExchangeConnector for BitunixConnector {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn ExchangeClient>, ExchangeError> {
        let client = BitunixClient::new(
            self.api_url.clone(),
            self.ws_url.clone(),
            credentials.clone(),
        )?;
        Ok(Box::new(client))
    }
}
