//! Background cleanup
//!
//! Expires delivered or abandoned artifacts and removes stale leftovers from
//! the upload and output directories.

use mqlc_compiler::files;
use std::path::Path;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::state::AppState;

/// Starts the sweep loop; abort the handle to stop it
pub fn spawn(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting cleanup sweeper (interval: {:?}, stale age: {:?})",
            state.config.sweep_interval, state.config.stale_file_age
        );

        let mut interval = time::interval(state.config.sweep_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            sweep_once(&state).await;
        }
    })
}

/// Runs one sweep and returns how many entries were removed
pub async fn sweep_once(state: &AppState) -> usize {
    let expired = state.cleanup.sweep().await;

    let max_age = state.config.stale_file_age;
    let stale = files::cleanup_old_files(&state.config.upload_dir, max_age).await
        + files::cleanup_old_files_except(&state.compiler().output_dir, max_age, |path| {
            is_pending_job_dir(state, path)
        })
        .await;

    debug!(
        "Sweep removed {} expired artifact(s) and {} stale file(s)",
        expired, stale
    );

    expired + stale
}

/// Job directories are named by job id; registered ones are still downloadable
fn is_pending_job_dir(state: &AppState, path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| Uuid::parse_str(name).ok())
        .is_some_and(|job_id| state.cleanup.contains(job_id))
}
