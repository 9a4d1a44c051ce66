//! MQL Compile CLI
//!
//! Command-line interface for the MQL compile service.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "mqlc")]
#[command(about = "Compile MQL4/MQL5 sources through the compile service", long_about = None)]
struct Cli {
    /// Compile service URL
    #[arg(long, env = "MQLC_SERVER_URL", default_value = "http://localhost:3000")]
    server_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        server_url: cli.server_url,
    };

    handle_command(cli.command, &config).await
}
