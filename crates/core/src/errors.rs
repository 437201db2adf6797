use thiserror::Error;

/// Typed failure categories of an exchange client.
///
/// Every client operation (credential check, history query, subscribe,
/// stream) reports failures through this type so they can be classified
/// without looking at message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("signature rejected: {0}")]
    Signature(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("exchange returned code {code}: {message}")]
    Api { code: i64, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ExchangeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
