//! elev - command-line client for the elevation backend.
//!
//! Submits ingestion jobs, follows them to completion over the status
//! stream, and exercises terrain auto-selection against the live layer
//! directory.

mod commands;
mod config;
mod error;
mod logging;
mod viewer;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use config::{Config, Overrides};
pub use error::CliError;

use commands::jobs::{StatusArgs, SubmitArgs, UploadArgs, WatchArgs};
use commands::terrain::{ModeArgs, SelectArgs};

#[derive(Parser)]
#[command(name = "elev")]
#[command(version, about = "Elevation ingestion and terrain selection client", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(long, short = 'c', global = true, env = "ELEV_CONFIG")]
    config: Option<PathBuf>,

    /// Backend API base URL
    #[arg(long, global = true, env = "ELEV_API_URL")]
    api_url: Option<String>,

    /// Bearer token forwarded to the backend
    #[arg(long, global = true, env = "ELEV_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Tenant id forwarded to the backend
    #[arg(long, global = true, env = "ELEV_TENANT")]
    tenant: Option<String>,

    /// Log filter used when RUST_LOG is not set (e.g. "debug", "elev_ingest=trace")
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Terrain mode preference file
    #[arg(long, global = true)]
    preferences: Option<PathBuf>,

    /// Serve Prometheus metrics on this address
    #[cfg(feature = "prometheus")]
    #[arg(long, global = true)]
    metrics_addr: Option<std::net::SocketAddr>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest remote elevation sources for a bounding box
    Submit(SubmitArgs),

    /// Upload a local elevation file for ingestion
    Upload(UploadArgs),

    /// Follow a job's status stream until it finishes
    Watch(WatchArgs),

    /// Poll a job's current status once
    Status(StatusArgs),

    /// Check that the backend is up
    Health,

    /// List the terrain layers known to the backend
    Layers,

    /// Replay a camera path through terrain auto-selection
    Select(SelectArgs),

    /// Show or change the persisted terrain mode
    Mode(ModeArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => e.exit(),
    };

    if let Err(e) = logging::init_logging(&config.log_level) {
        e.exit();
    }

    #[cfg(feature = "prometheus")]
    if let Some(addr) = cli.metrics_addr {
        if let Err(e) = elev_metrics::install_prometheus(addr) {
            CliError::Config(format!("failed to start metrics exporter: {e}")).exit();
        }
    }

    if let Err(e) = run(cli.command, &config).await {
        e.exit();
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let config = Config::load(cli.config.as_deref())?.apply(Overrides {
        api_base_url: cli.api_url.clone(),
        bearer_token: cli.token.clone(),
        tenant_id: cli.tenant.clone(),
        log_level: cli.log_level.clone(),
        preferences_path: cli.preferences.clone(),
    });
    config.validate()?;
    Ok(config)
}

async fn run(command: Command, config: &Config) -> Result<(), CliError> {
    match command {
        Command::Submit(args) => commands::jobs::submit(args, config).await,
        Command::Upload(args) => commands::jobs::upload(args, config).await,
        Command::Watch(args) => commands::jobs::watch(args, config).await,
        Command::Status(args) => commands::jobs::status(args, config).await,
        Command::Health => commands::jobs::health(config).await,
        Command::Layers => commands::terrain::layers(config).await,
        Command::Select(args) => commands::terrain::select(args, config).await,
        Command::Mode(args) => commands::terrain::mode(args, config),
    }
}
