//! Health command handler

use anyhow::Result;
use colored::*;
use mqlc_client::CompilerClient;

use crate::config::Config;

/// Query `/health` and print the result
pub async fn check_health(config: &Config) -> Result<()> {
    let client = CompilerClient::new(&config.server_url);
    let health = client.health().await?;

    println!(
        "{} {} is {}",
        "✓".green(),
        client.base_url(),
        health.status.green().bold()
    );
    println!(
        "  Checked:  {}",
        health
            .timestamp
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );

    if health.compiler_available {
        println!("  Compiler: {}", "available".green());
    } else {
        println!(
            "  Compiler: {}",
            "not installed (fallback output only)".yellow()
        );
    }

    Ok(())
}
