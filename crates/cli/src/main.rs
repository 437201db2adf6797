use clap::{Parser, Subcommand};

mod commands;
mod logging;

use commands::{ConfigureArgs, RunArgs, ShowConfigArgs, TodayArgs};

#[derive(Parser)]
#[command(name = "daily-pnl")]
#[command(about = "Tracks today's realized futures PnL on Bitunix", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tracker until interrupted
    Run(RunArgs),
    /// Validate and save API credentials and the output location
    Configure(ConfigureArgs),
    /// Print the current configuration with the secret masked
    ShowConfig(ShowConfigArgs),
    /// Print today's realized PnL once and exit
    Today(TodayArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Only the long-running tracker keeps a log file.
    let _guard = match &cli.command {
        Commands::Run(_) => Some(logging::init_with_file(
            &daily_pnl_core::config::log_dir(),
        )?),
        _ => {
            logging::init_stderr();
            None
        }
    };

    match cli.command {
        Commands::Run(args) => commands::run_tracker(args).await?,
        Commands::Configure(args) => commands::run_configure(args).await?,
        Commands::ShowConfig(args) => commands::run_show_config(args)?,
        Commands::Today(args) => commands::run_today(args).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_run_with_config() {
        let cli = Cli::try_parse_from(["daily-pnl", "run", "--config", "/tmp/c.json"]).unwrap();
        match cli.command {
            Commands::Run(args) => assert_eq!(args.config, Some(PathBuf::from("/tmp/c.json"))),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn configure_requires_both_credentials() {
        assert!(Cli::try_parse_from(["daily-pnl", "configure", "--api-key", "k"]).is_err());

        let cli = Cli::try_parse_from([
            "daily-pnl",
            "configure",
            "--api-key",
            "k",
            "--secret-key",
            "s",
            "--skip-validation",
        ])
        .unwrap();
        match cli.command {
            Commands::Configure(args) => {
                assert_eq!(args.api_key, "k");
                assert!(args.skip_validation);
                assert!(args.output.is_none());
            }
            _ => panic!("expected configure"),
        }
    }

    #[test]
    fn show_config_and_today_parse() {
        assert!(Cli::try_parse_from(["daily-pnl", "show-config"]).is_ok());
        assert!(Cli::try_parse_from(["daily-pnl", "today", "--verbose"]).is_ok());
    }
}
