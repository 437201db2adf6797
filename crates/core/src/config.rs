use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Name of the per-user application directory.
pub const APP_DIR_NAME: &str = ".daily-pnl";

/// Config file name inside the application directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// On-disk tracker configuration.
///
/// Field names match the JSON written by earlier releases so existing
/// `config.json` files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub secret_key: String,
    /// File or folder the running total is written to. Empty disables persistence.
    #[serde(default)]
    pub profit_and_loss_file: String,

    /// IANA timezone that defines "today".
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    /// Page size for the baseline history query.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
}

fn default_timezone() -> String {
    "Europe/Berlin".to_string()
}

const fn default_backoff_secs() -> u64 {
    300 // 5 minutes
}

const fn default_history_limit() -> u32 {
    100
}

fn default_api_url() -> String {
    "https://fapi.bitunix.com".to_string()
}

fn default_ws_url() -> String {
    "wss://fapi.bitunix.com/private/".to_string()
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            profit_and_loss_file: String::new(),
            timezone: default_timezone(),
            backoff_secs: default_backoff_secs(),
            history_limit: default_history_limit(),
            api_url: default_api_url(),
            ws_url: default_ws_url(),
        }
    }
}

impl TrackerConfig {
    /// Returns the credentials when both key and secret are set.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        if self.api_key.is_empty() || self.secret_key.is_empty() {
            return None;
        }
        Some(Credentials::new(self.api_key.clone(), self.secret_key.clone()))
    }

    /// Returns the configured output location, `None` when persistence is off.
    #[must_use]
    pub fn output_path(&self) -> Option<PathBuf> {
        let trimmed = self.profit_and_loss_file.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }

    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    /// Parses the configured timezone, falling back to Europe/Berlin.
    #[must_use]
    pub fn reference_timezone(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            tracing::warn!(
                timezone = %self.timezone,
                "Unknown timezone in config, using Europe/Berlin"
            );
            chrono_tz::Europe::Berlin
        })
    }

    /// Copy of this config with the secret masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.secret_key.is_empty() {
            copy.secret_key = "********".to_string();
        }
        copy
    }
}

/// API key and secret for the exchange account.
///
/// Validity is only known after a live call to the exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub secret: String,
}

impl Credentials {
    #[must_use]
    pub const fn new(api_key: String, secret: String) -> Self {
        Self { api_key, secret }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Returns the per-user application directory (`$HOME/.daily-pnl`).
#[must_use]
pub fn app_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map_or_else(|| PathBuf::from(APP_DIR_NAME), |home| PathBuf::from(home).join(APP_DIR_NAME))
}

#[must_use]
pub fn default_config_path() -> PathBuf {
    app_dir().join(CONFIG_FILE_NAME)
}

#[must_use]
pub fn log_dir() -> PathBuf {
    app_dir().join("logs")
}
