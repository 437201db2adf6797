use super::{config_path, load_config};
use anyhow::{Context, Result};
use clap::Args;
use daily_pnl_bitunix::BitunixConnector;
use daily_pnl_core::{format_pnl, ExchangeConnector, TrackingWindow};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct TodayArgs {
    /// Config file path (defaults to ~/.daily-pnl/config.json)
    #[arg(short, long, env = "DAILY_PNL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also list every closed position
    #[arg(short, long)]
    pub verbose: bool,
}

/// Queries today's closed positions once and prints the realized total.
///
/// # Errors
/// Returns an error if no credentials are configured or the exchange query fails.
pub async fn run_today(args: TodayArgs) -> Result<()> {
    let config = load_config(&config_path(args.config))?;
    let credentials = config
        .credentials()
        .context("No credentials configured; run `daily-pnl configure` first")?;

    let timezone = config.reference_timezone();
    let window = TrackingWindow::today(timezone);
    let connector = BitunixConnector::new(config.api_url.clone(), config.ws_url.clone());
    let client = connector.connect(&credentials).await?;
    let positions = client
        .closed_positions(&window, config.history_limit)
        .await
        .context("Failed to query closed positions")?;

    if args.verbose {
        for position in &positions {
            println!(
                "{:<16} {:<12} {:>12}",
                position.position_id,
                position.symbol,
                format_pnl(position.realized_pnl)
            );
        }
    }

    let total: f64 = positions.iter().map(|p| p.realized_pnl).sum();
    println!(
        "Todays PnL {} ({} closed positions since {})",
        format_pnl(total),
        positions.len(),
        window.start.with_timezone(&timezone)
    );
    Ok(())
}
