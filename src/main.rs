// src/main.rs

//! flatwatch CLI: feed watcher entry point.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use flatwatch::error::Result;
use flatwatch::models::{Config, Secrets};
use flatwatch::pipeline::{run_batch, run_watch};

/// flatwatch - real-estate feed watcher
#[derive(Parser, Debug)]
#[command(
    name = "flatwatch",
    version,
    about = "Watches paginated real-estate feeds and notifies Telegram chats of new listings"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one batch over all configured queries
    Run,

    /// Run batches forever on a fixed interval
    Watch {
        /// Seconds between batches
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn execute(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(&cli.config);
    config.validate()?;

    match cli.command {
        Command::Run => {
            let secrets = Secrets::from_env()?;
            run_batch(&config, &secrets).await?;
        }
        Command::Watch { interval_secs } => {
            let secrets = Secrets::from_env()?;
            log::info!("Watching every {}s", interval_secs);
            run_watch(&config, &secrets, Duration::from_secs(interval_secs)).await?;
        }
        Command::Validate => {
            log::info!(
                "Configuration OK: {} queries, seen file {}",
                config.queries.len(),
                config.paths.seen_file.display()
            );
            if let Err(e) = Secrets::from_env() {
                log::warn!("Environment incomplete: {}", e);
            }
        }
    }

    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = execute(cli).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
