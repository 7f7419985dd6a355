//! feed-slurper binary entrypoint.
//! Polls hackerspace timelines or wiki feeds and prints new items until
//! interrupted.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feed_slurper::orchestrator::{self, Mode, RunOptions};
use feed_slurper::{signal, SlurperConfig, StopReason};

#[derive(Parser)]
#[command(
    name = "feed-slurper",
    version,
    about = "Prints new hackerspace tweets and wiki edits as they appear"
)]
struct Cli {
    /// Config file (TOML or JSON); defaults to $SLURPER_CONFIG_PATH or config/slurper.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Tweets of every space in the SpaceAPI directory that lists a Twitter account
    Twitter(PollArgs),
    /// Recent changes of the configured hackerspace wikis
    Wiki(PollArgs),
}

#[derive(Args)]
struct PollArgs {
    /// Interval between polls of each source, in seconds
    #[arg(short, long)]
    interval: Option<u64>,

    /// Pause between subsequent printed updates, in seconds
    #[arg(short, long)]
    pause: Option<f64>,
}

/// Logs go to stderr so stdout carries only notifications.
/// `SLURPER_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feed_slurper=info,warn"));
    let json = std::env::var("SLURPER_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let (json_layer, compact_layer) = if json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (
            None,
            Some(fmt::layer().compact().with_writer(std::io::stderr)),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(compact_layer)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    // Ahead of config and exporter setup so an early Ctrl-C still stops cleanly.
    let shutdown = CancellationToken::new();
    if let Err(e) = signal::cancel_on_signal(shutdown.clone()) {
        tracing::warn!(error = %e, "could not install signal handlers");
    }

    let cfg = match &cli.config {
        Some(path) => SlurperConfig::load_from(path),
        None => SlurperConfig::load_default(),
    };
    let cfg = match cfg {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match feed_slurper::metrics::install_from_env() {
        Ok(Some(addr)) => tracing::info!(%addr, "prometheus exporter listening"),
        Ok(None) => {}
        Err(e) => {
            let error = format!("{e:#}");
            tracing::warn!(%error, "metrics exporter disabled");
        }
    }

    let (mode, args) = match cli.command {
        Command::Twitter(args) => (Mode::Twitter, args),
        Command::Wiki(args) => (Mode::Wiki, args),
    };
    let opts = RunOptions::resolve(mode, &cfg, args.interval, args.pause);

    match orchestrator::run(mode, &cfg, opts, shutdown).await {
        Ok(report) => {
            if report.stopped_by == StopReason::Shutdown {
                println!("\nThanks for playing!");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("feed-slurper: {e:#}");
            ExitCode::FAILURE
        }
    }
}
