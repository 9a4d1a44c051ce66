//! MQL Compile Server
//!
//! HTTP front end for the compile core. Accepts multipart uploads, runs them
//! through the job and batch orchestrators and serves the produced artifacts
//! for a short retention window.

use anyhow::{Context, Result};
use mqlc_compiler::{CompilerConfig, strategy};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod state;
pub mod sweeper;

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mqlc_server=info,mqlc_compiler=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting MQL compile server...");

    let config = ServerConfig::from_env().context("Failed to load server configuration")?;
    config.validate()?;

    let compiler = CompilerConfig::from_env().context("Failed to load compiler configuration")?;
    compiler.validate()?;

    for dir in [&config.upload_dir, &compiler.output_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    info!(
        "Compiler: {} (strategy: {}, timeout: {:?}, fallback: {})",
        compiler.compiler_path.display(),
        strategy::select(&compiler.compiler_path, compiler.platform),
        compiler.compile_timeout,
        if compiler.fallback_enabled { "enabled" } else { "disabled" }
    );

    if !compiler.compiler_available().await {
        warn!(
            "Compiler not found at {}; compilations will fail over to the fallback path",
            compiler.compiler_path.display()
        );
    }

    let addr = config.bind_addr.clone();
    let state = AppState::new(config, compiler);

    let sweeper = sweeper::spawn(state.clone());

    // Build router with all API endpoints
    let app = api::create_router(state.clone());

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.abort();
    let purged = state.cleanup.purge().await;
    info!("Server stopped ({} pending artifact(s) removed)", purged);

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
