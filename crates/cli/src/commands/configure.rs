//! Saves API credentials and the output location.
//!
//! Credentials are checked against the live account endpoint before they are
//! written, so a running tracker only ever picks up keys that worked once.

use super::config_path;
use anyhow::{bail, Context, Result};
use clap::Args;
use daily_pnl_bitunix::BitunixConnector;
use daily_pnl_core::{ConfigLoader, Credentials, ExchangeConnector, TrackerConfig};
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone)]
pub struct ConfigureArgs {
    /// Exchange API key
    #[arg(long)]
    pub api_key: String,

    /// Exchange API secret
    #[arg(long)]
    pub secret_key: String,

    /// Folder (or file) the running total is written to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file path (defaults to ~/.daily-pnl/config.json)
    #[arg(short, long, env = "DAILY_PNL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Save without checking the credentials against the exchange
    #[arg(long)]
    pub skip_validation: bool,
}

/// Runs the configure command.
///
/// # Errors
/// Returns an error if a field is empty, the output folder does not exist,
/// the exchange rejects the credentials, or the config cannot be written.
pub async fn run_configure(args: ConfigureArgs) -> Result<()> {
    let path = config_path(args.config);
    let mut config = if path.exists() {
        ConfigLoader::load_file(&path)
            .with_context(|| format!("Failed to read existing config {}", path.display()))?
    } else {
        TrackerConfig::default()
    };

    let api_key = args.api_key.trim();
    let secret_key = args.secret_key.trim();
    if api_key.is_empty() || secret_key.is_empty() {
        bail!("API key and secret key must not be empty");
    }

    if let Some(output) = &args.output {
        check_output_location(output)?;
        config.profit_and_loss_file = output.display().to_string();
    }

    config.api_key = api_key.to_string();
    config.secret_key = secret_key.to_string();

    if args.skip_validation {
        tracing::warn!("Skipping credential validation");
    } else {
        validate_credentials(&config).await?;
    }

    ConfigLoader::save(&path, &config)
        .with_context(|| format!("Failed to save config to {}", path.display()))?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

async fn validate_credentials(config: &TrackerConfig) -> Result<()> {
    let credentials = Credentials::new(config.api_key.clone(), config.secret_key.clone());
    let connector = BitunixConnector::new(config.api_url.clone(), config.ws_url.clone());

    let client = connector
        .connect(&credentials)
        .await
        .context("Failed to create exchange client")?;
    client
        .check_credentials()
        .await
        .context("Credential check failed; nothing was saved")?;

    tracing::info!("Credentials accepted by the exchange");
    Ok(())
}

/// The folder that will hold the value must already exist.
fn check_output_location(output: &Path) -> Result<()> {
    if output.as_os_str().is_empty() {
        bail!("Output path must not be empty");
    }
    if output.is_dir() {
        return Ok(());
    }
    if output.extension().is_none() {
        bail!("Output folder {} does not exist", output.display());
    }
    match output.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) if !parent.is_dir() => {
            bail!("Output folder {} does not exist", parent.display())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn existing_folder_is_accepted() {
        let dir = TempDir::new().unwrap();
        assert!(check_output_location(dir.path()).is_ok());
    }

    #[test]
    fn missing_folder_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = check_output_location(&dir.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn file_in_existing_folder_is_accepted() {
        let dir = TempDir::new().unwrap();
        assert!(check_output_location(&dir.path().join("pnl.txt")).is_ok());
    }

    #[test]
    fn file_in_missing_folder_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("missing").join("pnl.txt");
        assert!(check_output_location(&file).is_err());
    }

    #[tokio::test]
    async fn saves_without_validation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        run_configure(ConfigureArgs {
            api_key: " key ".to_string(),
            secret_key: "secret".to_string(),
            output: Some(dir.path().to_path_buf()),
            config: Some(path.clone()),
            skip_validation: true,
        })
        .await
        .unwrap();

        let saved = ConfigLoader::load_file(&path).unwrap();
        assert_eq!(saved.api_key, "key");
        assert_eq!(saved.secret_key, "secret");
        assert_eq!(saved.profit_and_loss_file, dir.path().display().to_string());
    }

    #[tokio::test]
    async fn empty_secret_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let result = run_configure(ConfigureArgs {
            api_key: "key".to_string(),
            secret_key: "  ".to_string(),
            output: None,
            config: Some(path.clone()),
            skip_validation: true,
        })
        .await;

        assert!(result.is_err());
        assert!(!path.exists());
    }
}
