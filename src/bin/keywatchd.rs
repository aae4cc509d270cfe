//! keywatch daemon - watches a project for new releases
//!
//! Runs the release monitor in the foreground and logs every observation.
//!
//! # Usage
//!
//! ```bash
//! # Watch a project until SIGINT/SIGTERM
//! keywatchd --owner octo --project widget
//!
//! # Fetch the latest release once and exit
//! keywatchd --owner octo --project widget check
//!
//! # Use another configuration file
//! KEYWATCH_CONFIG=/etc/keywatch.toml keywatchd
//!
//! # Enable debug logging
//! RUST_LOG=keywatchd=debug keywatchd watch
//! ```

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keywatch_core::ReleaseObservation;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use keywatchd::config::Config;
use keywatchd::release::{spawn_github_monitor, GithubReleaseSource, ReleaseSource};

/// keywatch daemon - release monitor
#[derive(Parser, Debug)]
#[command(name = "keywatchd", version, about)]
struct Args {
    /// Configuration file (defaults to $KEYWATCH_CONFIG or ~/.config/keywatch/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Owner of the watched project (overrides the config file)
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Name of the watched project (overrides the config file)
    #[arg(long, global = true)]
    project: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch for new releases until interrupted
    Watch,
    /// Fetch the latest release once and exit
    Check,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if args.owner.is_some() {
        config.release.owner = args.owner;
    }
    if args.project.is_some() {
        config.release.project = args.project;
    }

    match args.command.unwrap_or(Command::Watch) {
        Command::Watch => run_watch(config),
        Command::Check => {
            if !run_check(config)? {
                process::exit(1);
            }
            Ok(())
        }
    }
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.logging.filter)
            .with_context(|| format!("Invalid log filter {:?}", config.logging.filter))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Runs the release monitor until a shutdown signal arrives.
#[tokio::main]
async fn run_watch(config: Config) -> Result<()> {
    init_logging(&config)?;

    let settings = &config.release;
    let locator = settings.locator().context("No project to watch")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        url = %locator.url(),
        "keywatch daemon starting"
    );

    // Create cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let mut releases = spawn_github_monitor(
        cancel_token,
        &locator,
        settings.intervals(),
        settings.request_timeout(),
        &settings.user_agent,
    )
    .context("Failed to start release monitor")?;

    while let Some(observation) = releases.recv().await {
        match observation {
            ReleaseObservation::Success(release) => {
                info!(version = %release.tag_name, url = %release.html_url, "{release}");
            }
            ReleaseObservation::Failure(e) => {
                warn!(error = %e, "Release check failed, retrying");
            }
        }
    }

    info!("keywatch daemon stopped");
    Ok(())
}

/// Fetches the latest release once. Returns false if the fetch failed.
#[tokio::main]
async fn run_check(config: Config) -> Result<bool> {
    let settings = &config.release;
    let locator = settings.locator().context("No project to check")?;
    let source = GithubReleaseSource::with_options(
        &locator,
        settings.request_timeout(),
        &settings.user_agent,
    )?;

    match source.latest_release().await {
        Ok(release) => {
            println!("{release}: {}", release.html_url);
            Ok(true)
        }
        Err(e) => {
            eprintln!("{e}");
            Ok(false)
        }
    }
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
