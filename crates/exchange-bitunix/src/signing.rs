use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Headers attached to every authenticated REST request.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub api_key: String,
    pub nonce: String,
    pub timestamp: String,
    pub sign: String,
}

/// Random 32 character alphanumeric nonce.
#[must_use]
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[must_use]
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Query parameters sorted by key and concatenated as `key1value1key2value2`.
#[must_use]
pub fn canonical_query(params: &[(&str, String)]) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted.iter().map(|(k, v)| format!("{k}{v}")).collect()
}

/// REST signature: `sha256(sha256(nonce + timestamp + api_key + query + body) + secret)`.
#[must_use]
pub fn sign_request(
    api_key: &str,
    secret: &str,
    nonce: &str,
    timestamp: &str,
    query: &str,
    body: &str,
) -> String {
    let digest = sha256_hex(&format!("{nonce}{timestamp}{api_key}{query}{body}"));
    sha256_hex(&format!("{digest}{secret}"))
}

/// WebSocket login signature: `sha256(sha256(nonce + timestamp + api_key) + secret)`.
#[must_use]
pub fn sign_login(api_key: &str, secret: &str, nonce: &str, timestamp: i64) -> String {
    let digest = sha256_hex(&format!("{nonce}{timestamp}{api_key}"));
    sha256_hex(&format!("{digest}{secret}"))
}

/// Builds the signed headers for a request made now.
#[must_use]
pub fn signed_headers(
    api_key: &str,
    secret: &str,
    params: &[(&str, String)],
    body: &str,
) -> SignedHeaders {
    let nonce = generate_nonce();
    let timestamp = chrono::Utc::now().timestamp_millis().to_string();
    let sign = sign_request(
        api_key,
        secret,
        &nonce,
        &timestamp,
        &canonical_query(params),
        body,
    );
    SignedHeaders {
        api_key: api_key.to_string(),
        nonce,
        timestamp,
        sign,
    }
}
