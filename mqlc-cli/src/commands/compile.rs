//! Compile command handlers
//!
//! Uploads sources to the service and writes the returned artifacts.

use anyhow::{Context, Result};
use colored::*;
use mqlc_client::{BatchFileReport, ClientError, CompilerClient};
use mqlc_compiler::files::format_file_size;
use mqlc_core::domain::result::Fidelity;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Compile one file and write the artifact
pub async fn compile_file(config: &Config, file: &Path, output: Option<&Path>) -> Result<()> {
    let client = CompilerClient::new(&config.server_url);

    println!("{} {}", "Compiling".bold(), file.display());

    let compiled = match client.compile_file(file).await {
        Ok(compiled) => compiled,
        Err(e) => {
            print_client_error(&e);
            return Err(e.into());
        }
    };

    let target = output_path(file, output, &compiled.file_name);
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(&target, &compiled.bytes)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;

    println!(
        "{} {} ({})",
        "✓ Wrote".green(),
        target.display(),
        format_file_size(compiled.bytes.len() as u64).dimmed()
    );
    if compiled.fidelity == Fidelity::Fallback {
        print_fallback_warning();
    }

    Ok(())
}

/// Compile several files and optionally download the artifacts
pub async fn compile_batch(
    config: &Config,
    files: &[PathBuf],
    download_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let client = CompilerClient::new(&config.server_url);

    let report = match client.compile_batch(files).await {
        Ok(report) => report,
        Err(e) => {
            print_client_error(&e);
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{}",
            format!(
                "{}/{} file(s) compiled",
                report.successful_compilations, report.total_files
            )
            .bold()
        );
        println!();
        for result in &report.results {
            print_batch_result(result);
        }
    }

    if let Some(dir) = download_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        for result in report.results.iter().filter(|r| r.success) {
            let (Some(url), Some(name)) = (&result.download_url, &result.output_file) else {
                continue;
            };

            match client.download(url).await {
                Ok(bytes) => {
                    let target = dir.join(name);
                    tokio::fs::write(&target, &bytes)
                        .await
                        .with_context(|| format!("Failed to write {}", target.display()))?;
                    if !json {
                        println!("{} {}", "↓".cyan(), target.display());
                    }
                }
                Err(e) => eprintln!(
                    "{} {}: {}",
                    "✗ Download failed for".red(),
                    result.filename,
                    e
                ),
            }
        }
    }

    if report.successful_compilations < report.total_files {
        anyhow::bail!(
            "{} of {} file(s) failed to compile",
            report.total_files - report.successful_compilations,
            report.total_files
        );
    }

    Ok(())
}

/// Where a single artifact is written
fn output_path(source: &Path, output: Option<&Path>, artifact_name: &str) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => source
            .parent()
            .map(|dir| dir.join(artifact_name))
            .unwrap_or_else(|| PathBuf::from(artifact_name)),
    }
}

fn print_batch_result(result: &BatchFileReport) {
    if result.success {
        let size = result.size.map(format_file_size).unwrap_or_default();
        println!(
            "  {} {} → {} {}",
            "✓".green(),
            result.filename,
            result.output_file.as_deref().unwrap_or("?"),
            size.dimmed()
        );
        if result.fidelity == Some(Fidelity::Fallback) {
            print!("    ");
            print_fallback_warning();
        }
    } else {
        println!(
            "  {} {}: {}",
            "✗".red(),
            result.filename,
            result.error.as_deref().unwrap_or("unknown error").red()
        );
        if let Some(logs) = &result.logs {
            for line in logs.lines() {
                println!("      {}", line.dimmed());
            }
        }
    }
}

fn print_fallback_warning() {
    println!(
        "{}",
        "⚠ Compiler unavailable: artifact is the relabelled source, not compiled output".yellow()
    );
}

fn print_client_error(err: &ClientError) {
    eprintln!("{} {}", "✗".red(), err.to_string().red());
    if let Some(logs) = err.logs() {
        eprintln!("{}", "─".repeat(80).dimmed());
        for line in logs.lines() {
            eprintln!("{}", line.dimmed());
        }
        eprintln!("{}", "─".repeat(80).dimmed());
    }
}
