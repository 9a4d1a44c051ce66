//! File lifecycle utilities
//!
//! Staging of uploads under collision-resistant names, quiet deletion that never
//! masks a job outcome, size formatting and stale-file sweeping.

use mqlc_core::domain::job::SourceUpload;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StagingError;

/// Reduces a client-supplied file name to its final path component
///
/// Handles both separators so a Windows-style name cannot escape the staging
/// directory on unix either.
pub fn sanitize_file_name(original: &str) -> String {
    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        "upload".to_string()
    } else {
        name.to_string()
    }
}

/// Builds a per-job unique name: `<stem>-<millis>-<random><.ext>`
///
/// The original extension is kept so extension-based validation still works
/// on the staged copy.
pub fn unique_filename(original: &str) -> String {
    let sanitized = sanitize_file_name(original);
    let path = Path::new(&sanitized);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let millis = chrono::Utc::now().timestamp_millis();
    let random = Uuid::new_v4().simple().to_string();

    format!("{}-{}-{}{}", stem, millis, &random[..12], ext)
}

/// Writes uploaded bytes into `dir` under a unique name
pub async fn stage_upload(
    dir: &Path,
    original_name: &str,
    bytes: &[u8],
) -> Result<SourceUpload, StagingError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| StagingError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

    let path = dir.join(unique_filename(original_name));
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| StagingError::Write {
            path: path.clone(),
            source,
        })?;

    debug!("Staged {} as {}", original_name, path.display());

    Ok(SourceUpload::new(path, sanitize_file_name(original_name)))
}

/// Deletes a file, logging and swallowing any failure
///
/// Returns true when this call removed the file. A file that is already gone
/// counts as cleaned.
pub async fn discard(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Cleaned up file: {}", path.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("File already removed: {}", path.display());
            false
        }
        Err(e) => {
            warn!("Error cleaning up file {}: {}", path.display(), e);
            false
        }
    }
}

/// Recursively deletes a directory, logging and swallowing any failure
pub async fn discard_dir(path: &Path) -> bool {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            debug!("Cleaned up directory: {}", path.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Error cleaning up directory {}: {}", path.display(), e);
            false
        }
    }
}

/// Formats a byte count for humans (`0 Bytes`, `1.5 KB`, `2 MB`)
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded as u64, UNITS[unit])
    } else {
        format!("{} {}", rounded, UNITS[unit])
    }
}

/// Basic facts about a path on disk
#[derive(Debug, Clone)]
pub struct FileStats {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_file: bool,
    pub is_dir: bool,
}

impl FileStats {
    pub fn size_formatted(&self) -> String {
        format_file_size(self.size)
    }
}

/// Reads stats for `path`, or `None` if it cannot be inspected
pub async fn file_stats(path: &Path) -> Option<FileStats> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Some(FileStats {
            size: meta.len(),
            modified: meta.modified().ok(),
            is_file: meta.is_file(),
            is_dir: meta.is_dir(),
        }),
        Err(e) => {
            debug!("Cannot stat {}: {}", path.display(), e);
            None
        }
    }
}

/// Removes entries of `dir` not modified within `max_age`
///
/// Returns the number of entries removed. Errors are logged and skipped.
pub async fn cleanup_old_files(dir: &Path, max_age: Duration) -> usize {
    cleanup_old_files_except(dir, max_age, |_| false).await
}

/// Like [`cleanup_old_files`], but leaves entries for which `keep` is true
pub async fn cleanup_old_files_except<F>(dir: &Path, max_age: Duration, keep: F) -> usize
where
    F: Fn(&Path) -> bool,
{
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Error cleaning up old files in {}: {}", dir.display(), e);
            }
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut stale: Vec<(PathBuf, bool)> = Vec::new();

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Error reading {}: {}", dir.display(), e);
                break;
            }
        };

        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        let age = meta
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();

        let path = entry.path();
        if age > max_age && !keep(&path) {
            stale.push((path, meta.is_dir()));
        }
    }

    let mut removed = 0;
    for (path, is_dir) in stale {
        let done = if is_dir {
            discard_dir(&path).await
        } else {
            discard(&path).await
        };
        if done {
            info!("Cleaned up old file: {}", path.display());
            removed += 1;
        }
    }

    removed
}
