//! Shared application state

use mqlc_compiler::{BatchOrchestrator, CleanupRegistry, CompilerConfig, JobOrchestrator};
use std::sync::Arc;

use crate::config::ServerConfig;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub jobs: JobOrchestrator,
    pub batch: BatchOrchestrator,
    pub cleanup: Arc<CleanupRegistry>,
}

impl AppState {
    pub fn new(config: ServerConfig, compiler: CompilerConfig) -> Self {
        let cleanup = Arc::new(CleanupRegistry::new());
        let jobs = JobOrchestrator::new(Arc::new(compiler), Arc::clone(&cleanup));
        let batch = BatchOrchestrator::new(jobs.clone());

        Self {
            config: Arc::new(config),
            jobs,
            batch,
            cleanup,
        }
    }

    pub fn compiler(&self) -> &CompilerConfig {
        self.jobs.config()
    }
}
