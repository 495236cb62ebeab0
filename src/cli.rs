//! Command-line interface for strictly_duel.

use clap::{Parser, Subcommand};

/// Strictly Duel - two-player tic-tac-toe over WebSockets
#[derive(Parser, Debug)]
#[command(name = "strictly_duel")]
#[command(about = "Two-seat tic-tac-toe server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the game server
    Serve {
        /// Path to the TOML config file (defaults apply if it doesn't exist)
        #[arg(short, long, default_value = "strictly_duel.toml")]
        config: std::path::PathBuf,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory with index.html and static/ (overrides config)
        #[arg(long)]
        assets: Option<std::path::PathBuf>,
    },
}
