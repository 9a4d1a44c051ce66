//! Check command handler
//!
//! Runs the same structural validation the service applies, locally.

use anyhow::Result;
use colored::*;
use mqlc_compiler::{files, validator};
use std::path::{Path, PathBuf};

/// Validate every file and fail if any is rejected
pub async fn check_files(paths: &[PathBuf]) -> Result<()> {
    let mut rejected = 0;

    for path in paths {
        match check_file(path).await {
            Ok(size) => println!("  {} {} {}", "✓".green(), path.display(), size.dimmed()),
            Err(reason) => {
                rejected += 1;
                println!("  {} {}: {}", "✗".red(), path.display(), reason.red());
            }
        }
    }

    if rejected > 0 {
        anyhow::bail!("{} of {} file(s) failed validation", rejected, paths.len());
    }

    Ok(())
}

/// Returns the formatted size of a valid file, or why it was rejected
async fn check_file(path: &Path) -> std::result::Result<String, String> {
    let stats = files::file_stats(path)
        .await
        .filter(|stats| stats.is_file)
        .ok_or_else(|| "not a readable file".to_string())?;

    if !validator::has_accepted_extension(path) {
        return Err("expected a .mq5 or .mq4 file".to_string());
    }

    if !validator::validate(path).await {
        return Err("no MQL markers found (#property, OnInit, OnTick, OnStart, input, extern)".to_string());
    }

    Ok(stats.size_formatted())
}
