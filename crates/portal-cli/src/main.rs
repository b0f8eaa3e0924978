//! Portal command-line client.
//!
//! Usage:
//!   # Show the current (persisted) station id without touching the network
//!   portal show
//!
//!   # Load or issue the station id
//!   portal ensure
//!
//!   # Drop the in-memory id and reload it / forget it and issue a new one
//!   portal refresh
//!   portal reset
//!
//!   # Remove the persisted id
//!   portal clear
//!
//!   # Call an API path with the station header attached
//!   portal get Citas/Hoy
//!
//! Logs go to stderr; `RUST_LOG=portal_client=debug` shows cache and
//! issuance decisions.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing_subscriber::{EnvFilter, fmt};

use portal_client::constants::NAVIGATION_CHANNEL_CAPACITY;
use portal_client::{IdentityState, Portal, PortalConfig, RootProvider};

/// Station identity and API access for the portal backend.
#[derive(Parser, Debug)]
#[command(name = "portal")]
#[command(about = "Station identity and API client for the portal backend")]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/portal/config.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL, overrides config and PORTAL_API_BASE
    #[arg(long)]
    api_base: Option<String>,

    /// Station id storage file, overrides config and PORTAL_STORAGE_PATH
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Do not send client hints with issuance requests
    #[arg(long)]
    no_hints: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the persisted station id, if any
    Show,
    /// Load the persisted station id or issue a new one
    Ensure,
    /// Clear the in-memory id and initialize again
    Refresh,
    /// Forget the id (memory and storage) and issue a new one
    Reset,
    /// Remove the persisted station id
    Clear,
    /// GET an API path with the station header attached
    Get {
        /// Path relative to the API base, e.g. `Citas/Hoy`
        path: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<PortalConfig> {
    let mut config = PortalConfig::load(args.config.as_deref()).context("loading config")?;
    if let Some(base) = &args.api_base {
        config.api_base = base.clone();
    }
    if let Some(path) = &args.storage {
        config.storage_path = Some(path.clone());
    }
    if args.no_hints {
        config.send_client_hints = false;
    }
    config.validate().context("validating config")?;
    Ok(config)
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let Portal { station, api } = portal_client::bootstrap(&config)?;

    match args.command {
        Command::Show => match station.cache().read() {
            Some(id) => println!("{id}"),
            None => println!("(none)"),
        },
        Command::Ensure => {
            // Same path the application takes: the root provider mounts and
            // triggers, and we wait for that attempt to settle.
            let (nav_tx, nav_rx) = broadcast::channel(NAVIGATION_CHANNEL_CAPACITY);
            let provider = RootProvider::new(station.clone()).mount(nav_rx);
            let id = provider.station().ensure_initialized().await?;
            drop(nav_tx);
            print_state(&provider.station().snapshot());
            tracing::debug!(station = id.short(), "Ready");
        }
        Command::Refresh => {
            station.refresh().await?;
            print_state(&station.snapshot());
        }
        Command::Reset => {
            station.reset().await?;
            print_state(&station.snapshot());
        }
        Command::Clear => {
            if station.cache().clear() {
                println!("cleared");
            } else {
                anyhow::bail!("could not clear persisted station id");
            }
        }
        Command::Get { path } => {
            station.ensure_initialized().await?;
            let body = api.get_text(&path).await?;
            match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
                Err(_) => println!("{body}"),
            }
        }
    }
    Ok(())
}

fn print_state(state: &IdentityState) {
    let view = serde_json::json!({
        "id": state.id.as_ref().map(|id| id.as_str()),
        "isLoading": state.is_loading,
        "error": state.error,
        "lastUpdated": state.last_updated,
    });
    println!("{view:#}");
}
