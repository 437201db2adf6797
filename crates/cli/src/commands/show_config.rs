use super::{config_path, load_config};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ShowConfigArgs {
    /// Config file path (defaults to ~/.daily-pnl/config.json)
    #[arg(short, long, env = "DAILY_PNL_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Prints the effective config with the secret masked.
///
/// # Errors
/// Returns an error if the config cannot be loaded or serialized.
pub fn run_show_config(args: ShowConfigArgs) -> Result<()> {
    let path = config_path(args.config);
    let config = load_config(&path)?;

    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    Ok(())
}
