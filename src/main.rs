use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use julet::monitor::{self, ActivityMonitor};
use julet::notify::{Deduplicated, LogSink};
use julet::store::credentials;
use julet::store::watchlist::Watchlist;
use julet::{api::JulesClient, config, tui};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "julet")]
#[command(about = "Terminal client for the Jules remote coding agent")]
#[command(version)]
struct Args {
    /// Initialize configuration
    #[arg(long)]
    init: bool,

    /// Path to config file
    #[arg(long, short)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch sessions without the TUI, printing notifications to stdout
    Watch {
        /// Seconds between sweeps (defaults to polling.session_interval_secs)
        #[arg(long)]
        interval: Option<u64>,

        /// Run a single sweep and exit (for cron-style scheduling)
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("julet=info".parse()?),
        )
        .init();

    if args.init {
        config::init_wizard().await?;
        return Ok(());
    }

    let config = config::load(args.config.as_deref())?;

    match args.command {
        Some(Command::Watch { interval, once }) => run_watch(config, interval, once).await,
        None => tui::run(config).await,
    }
}

/// Headless sweep loop: same monitor as the TUI, log sink for delivery.
async fn run_watch(config: config::Config, interval: Option<u64>, once: bool) -> Result<()> {
    let api_key = credentials::load_api_key()?
        .context("No API key configured. Run `julet --init` or set JULES_API_KEY.")?;
    let client = JulesClient::new(&config.api.base_url, api_key);
    let watchlist = Arc::new(Watchlist::open(Watchlist::default_path()?)?);

    if watchlist.watched_sessions().await.is_empty() {
        println!("No watched sessions. Open a session in the TUI to start watching it.");
        if once {
            return Ok(());
        }
    }

    let monitor = Arc::new(ActivityMonitor::new(
        Arc::new(client),
        Arc::clone(&watchlist) as Arc<dyn monitor::WatchRegistry>,
        Arc::new(Deduplicated::new(LogSink)),
    ));

    if once {
        let outcome = monitor.sweep().await;
        println!(
            "Checked {} watched sessions, {} new, {} failed",
            outcome.checked, outcome.notified, outcome.failed
        );
        return Ok(());
    }

    let period = interval
        .unwrap_or(config.polling.session_interval_secs)
        .max(5);
    tracing::info!("Watching sessions every {}s; Ctrl-C to stop", period);

    let handle = monitor::spawn_polling(monitor, Duration::from_secs(period));
    tokio::signal::ctrl_c().await?;
    handle.abort();

    Ok(())
}
