//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod check;
mod compile;
mod health;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Compile one source file and save the artifact
    Compile {
        /// Source file (.mq5 or .mq4)
        file: PathBuf,

        /// Where to write the artifact (default: next to the source)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compile several source files in one request
    Batch {
        /// Source files (.mq5 or .mq4)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Download successful artifacts into this directory
        #[arg(long)]
        download_dir: Option<PathBuf>,

        /// Print the raw batch report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check service health
    Health,
    /// Validate source files locally without contacting the service
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Compile { file, output } => {
            compile::compile_file(config, &file, output.as_deref()).await
        }
        Commands::Batch {
            files,
            download_dir,
            json,
        } => compile::compile_batch(config, &files, download_dir.as_deref(), json).await,
        Commands::Health => health::check_health(config).await,
        Commands::Check { files } => check::check_files(&files).await,
    }
}
