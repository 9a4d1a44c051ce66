//! Pending artifact cleanup
//!
//! A successful job leaves its artifact on disk so the caller can still fetch
//! it. The orchestrator records it here with an expiry instead of starting a
//! timer; a supervising task calls [`CleanupRegistry::sweep`] periodically.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::files;

/// An artifact waiting for deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCleanup {
    pub job_id: Uuid,
    pub artifact_path: PathBuf,
    /// Per-job directory removed together with the artifact
    pub job_dir: PathBuf,
    pub expires_at: DateTime<Utc>,
}

/// Registry of artifacts marked "pending cleanup after delivery"
#[derive(Debug, Default)]
pub struct CleanupRegistry {
    pending: Mutex<HashMap<Uuid, PendingCleanup>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an artifact for deletion once `grace` has passed
    ///
    /// Returns the instant after which the artifact is gone.
    pub fn schedule(
        &self,
        job_id: Uuid,
        artifact_path: PathBuf,
        job_dir: PathBuf,
        grace: Duration,
    ) -> DateTime<Utc> {
        let grace = TimeDelta::from_std(grace).unwrap_or(TimeDelta::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(grace)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        debug!(
            "Artifact {} pending cleanup at {}",
            artifact_path.display(),
            expires_at
        );

        self.lock().insert(
            job_id,
            PendingCleanup {
                job_id,
                artifact_path,
                job_dir,
                expires_at,
            },
        );

        expires_at
    }

    /// Moves an entry's expiry to now, typically once the artifact was delivered
    pub fn expedite(&self, job_id: Uuid) -> bool {
        match self.lock().get_mut(&job_id) {
            Some(entry) => {
                entry.expires_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// The pending entry for a job, if it has not expired yet
    pub fn lookup(&self, job_id: Uuid) -> Option<PendingCleanup> {
        let now = Utc::now();
        self.lock()
            .get(&job_id)
            .filter(|entry| entry.expires_at > now)
            .cloned()
    }

    /// Whether the job still has an entry, expired or not
    pub fn contains(&self, job_id: Uuid) -> bool {
        self.lock().contains_key(&job_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes and returns every entry expired at `now`
    pub fn take_expired(&self, now: DateTime<Utc>) -> Vec<PendingCleanup> {
        let mut pending = self.lock();
        let expired: Vec<Uuid> = pending
            .values()
            .filter(|entry| entry.expires_at <= now)
            .map(|entry| entry.job_id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| pending.remove(&id))
            .collect()
    }

    /// Deletes every expired artifact; returns how many were removed
    pub async fn sweep(&self) -> usize {
        let expired = self.take_expired(Utc::now());
        self.remove_all(expired).await
    }

    /// Deletes every registered artifact regardless of expiry (shutdown)
    pub async fn purge(&self) -> usize {
        let all: Vec<PendingCleanup> = self.lock().drain().map(|(_, entry)| entry).collect();
        self.remove_all(all).await
    }

    async fn remove_all(&self, entries: Vec<PendingCleanup>) -> usize {
        let mut removed = 0;
        for entry in entries {
            files::discard(&entry.artifact_path).await;
            if files::discard_dir(&entry.job_dir).await {
                removed += 1;
            }
        }
        if removed > 0 {
            info!("Cleaned up {} compiled artifact(s)", removed);
        }
        removed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, PendingCleanup>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
