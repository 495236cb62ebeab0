//! Strictly Duel - server binary.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use strictly_duel::ServerConfig;
use tracing::{info, instrument};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            host,
            port,
            assets,
        } => run_server(config, host, port, assets).await,
    }
}

/// Run the game server
async fn run_server(
    config_path: std::path::PathBuf,
    host: Option<String>,
    port: Option<u16>,
    assets: Option<std::path::PathBuf>,
) -> Result<()> {
    let mut config = ServerConfig::load_or_default(&config_path)?;
    initialize_tracing(config.log_filter());

    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if let Some(assets) = assets {
        config = config.with_assets_dir(assets);
    }

    info!(
        config_path = %config_path.display(),
        addr = %config.bind_address(),
        assets = %config.assets_dir().display(),
        "Starting Strictly Duel server"
    );
    strictly_duel::serve(&config).await?;
    info!("Server stopped");

    Ok(())
}

#[instrument]
fn initialize_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Tracing initialized");
}
