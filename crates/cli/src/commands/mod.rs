//! CLI commands for the daily PnL tracker.

pub mod configure;
pub mod run;
pub mod show_config;
pub mod today;

pub use configure::{run_configure, ConfigureArgs};
pub use run::{run_tracker, RunArgs};
pub use show_config::{run_show_config, ShowConfigArgs};
pub use today::{run_today, TodayArgs};

use anyhow::{Context, Result};
use daily_pnl_core::config::default_config_path;
use daily_pnl_core::{ConfigLoader, TrackerConfig};
use std::path::{Path, PathBuf};

/// Config path given on the command line, or the per-user default.
fn config_path(arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(default_config_path)
}

fn load_config(path: &Path) -> Result<TrackerConfig> {
    ConfigLoader::load(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
