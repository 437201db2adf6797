use crate::config::TrackerConfig;
use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};
use std::path::Path;
use thiserror::Error;

/// Prefix for environment overrides, e.g. `DAILY_PNL_API_KEY`.
pub const ENV_PREFIX: &str = "DAILY_PNL_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the tracker configuration by layering defaults, the JSON file and
    /// `DAILY_PNL_*` environment variables.
    ///
    /// A missing file is not an error; it is the normal state on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: &Path) -> Result<TrackerConfig, ConfigError> {
        Self::figment(path)
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Loads only what is stored in the file, without environment overrides.
    ///
    /// Used when rewriting the file so env-only secrets are not persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_file(path: &Path) -> Result<TrackerConfig, ConfigError> {
        Self::figment(path)
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(TrackerConfig::default())).merge(Json::file(path))
    }

    /// Writes the configuration as pretty JSON, creating the parent directory.
    ///
    /// On Unix the file is restricted to the owner (`0600`).
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(path: &Path, config: &TrackerConfig) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let data = serde_json::to_vec_pretty(config)?;
        std::fs::write(path, data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "Saved config");
        Ok(())
    }
}
