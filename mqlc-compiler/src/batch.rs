//! Batch orchestrator
//!
//! Fans a set of uploads out to the job orchestrator. Jobs run concurrently,
//! bounded by a semaphore, and the report keeps submission order. A job that
//! panics produces an `Unexpected` entry; its siblings are unaffected.

use mqlc_core::domain::batch::{BatchEntry, BatchResult};
use mqlc_core::domain::job::SourceUpload;
use mqlc_core::domain::result::CompileResult;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::files;
use crate::orchestrator::JobOrchestrator;

/// Runs batches of compile jobs with bounded parallelism
#[derive(Clone)]
pub struct BatchOrchestrator {
    jobs: JobOrchestrator,
    semaphore: Arc<Semaphore>,
}

impl BatchOrchestrator {
    /// Creates a batch orchestrator allowing `max_parallel_jobs` jobs at once
    pub fn new(jobs: JobOrchestrator) -> Self {
        let permits = jobs.config().max_parallel_jobs.max(1);
        Self {
            jobs,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Compiles every upload and reports them in submission order
    pub async fn run(&self, uploads: Vec<SourceUpload>) -> BatchResult {
        if uploads.is_empty() {
            return BatchResult::from_entries(Vec::new());
        }

        info!("Starting batch of {} file(s)", uploads.len());

        let handles: Vec<(SourceUpload, JoinHandle<CompileResult>)> = uploads
            .into_iter()
            .map(|upload| {
                let handle = self.spawn_job(upload.clone());
                (upload, handle)
            })
            .collect();

        let mut entries = Vec::with_capacity(handles.len());
        for (upload, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Compile task for {} failed: {}", upload.original_name, e);
                    files::discard(&upload.path).await;
                    CompileResult::unexpected(format!("Compilation task failed: {}", e))
                }
            };

            entries.push(BatchEntry {
                file_name: upload.original_name,
                result,
            });
        }

        let report = BatchResult::from_entries(entries);
        info!(
            "Batch finished: {}/{} succeeded",
            report.successful_compilations, report.total_files
        );
        report
    }

    fn spawn_job(&self, upload: SourceUpload) -> JoinHandle<CompileResult> {
        let jobs = self.jobs.clone();
        let semaphore = Arc::clone(&self.semaphore);

        tokio::spawn(async move {
            // The semaphore is never closed, so acquiring only waits
            let _permit = semaphore.acquire_owned().await.ok();
            jobs.run(upload).await
        })
    }
}
