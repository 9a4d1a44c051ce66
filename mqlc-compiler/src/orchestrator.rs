//! Job orchestrator
//!
//! Drives one compile job through its state machine:
//!
//! ```text
//! Validating -> InvokingPrimary -> Succeeded
//!                               -> InvokingFallback -> Succeeded | Failed
//! Validating -> Failed
//! ```
//!
//! Success is decided only by the expected artifact existing on disk after the
//! compiler exits or is killed. Exit codes are recorded and never trusted.
//!
//! The job owns its uploaded source and its output directory. The source is
//! deleted whatever happens; the output directory is deleted on failure and
//! handed to the [`CleanupRegistry`] on success.

use mqlc_core::domain::job::{CompileJob, JobStage, SourceUpload};
use mqlc_core::domain::result::{
    CompileFailure, CompileResult, CompiledArtifact, ErrorKind, Fidelity,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cleanup::CleanupRegistry;
use crate::config::CompilerConfig;
use crate::fallback::{CopyFallback, FallbackCompiler, FallbackOutcome};
use crate::files;
use crate::invoker::{self, InvocationOutcome};
use crate::strategy;
use crate::validator;

/// Runs compile jobs; cheap to clone and share between tasks
#[derive(Clone)]
pub struct JobOrchestrator {
    config: Arc<CompilerConfig>,
    fallback: Option<Arc<dyn FallbackCompiler>>,
    cleanup: Arc<CleanupRegistry>,
}

impl JobOrchestrator {
    /// Creates an orchestrator using the copy fallback when the config allows it
    pub fn new(config: Arc<CompilerConfig>, cleanup: Arc<CleanupRegistry>) -> Self {
        let fallback = config.fallback_enabled.then(|| {
            Arc::new(CopyFallback::new(config.fallback_timeout)) as Arc<dyn FallbackCompiler>
        });

        Self {
            config,
            fallback,
            cleanup,
        }
    }

    /// Replaces the fallback path; `None` disables it
    pub fn with_fallback(mut self, fallback: Option<Arc<dyn FallbackCompiler>>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn cleanup_registry(&self) -> &Arc<CleanupRegistry> {
        &self.cleanup
    }

    /// Runs one job to a terminal state and cleans up after it
    pub async fn run(&self, upload: SourceUpload) -> CompileResult {
        let mut job = CompileJob::new(&upload, &self.config.output_dir);
        let mut owned = JobFiles::new(job.source_path.clone(), job.output_dir().to_path_buf());

        info!("Compiling: {} (job {})", job.original_name, job.id);

        let result = self.drive(&mut job, &mut owned).await;

        owned.release().await;

        match &result {
            CompileResult::Succeeded(artifact) => info!(
                "Job {} succeeded: {} ({} bytes, {})",
                job.id,
                artifact.path.display(),
                artifact.size,
                artifact.fidelity
            ),
            CompileResult::Failed(failure) => warn!(
                "Job {} failed ({}): {}",
                job.id, failure.kind, failure.detail
            ),
        }

        result
    }

    /// Runs a job in its own task so a panic becomes an `Unexpected` failure
    pub async fn run_isolated(&self, upload: SourceUpload) -> CompileResult {
        let orchestrator = self.clone();
        let source = upload.path.clone();

        match tokio::spawn(async move { orchestrator.run(upload).await }).await {
            Ok(result) => result,
            Err(e) => {
                error!("Compile task for {} failed: {}", source.display(), e);
                files::discard(&source).await;
                CompileResult::unexpected(format!("Compilation task failed: {}", e))
            }
        }
    }

    async fn drive(&self, job: &mut CompileJob, owned: &mut JobFiles) -> CompileResult {
        if !validator::validate(&job.source_path).await {
            job.log_error("Invalid MQ5 file format");
            return self.fail(job, ErrorKind::InvalidInput, "Invalid MQ5 file format", None);
        }

        job.advance(JobStage::InvokingPrimary);

        if let Err(e) = tokio::fs::create_dir_all(job.output_dir()).await {
            let detail = format!("Compilation setup failed: {}", e);
            job.log_error(detail.clone());
            return self.fail(job, ErrorKind::Unexpected, detail, None);
        }

        let strategy = strategy::select(&self.config.compiler_path, self.config.platform);
        job.strategy = Some(strategy);

        let command =
            strategy::command_line(strategy, &self.config, &job.source_path, &job.artifact_path);
        job.log_info(format!("Primary compilation ({} strategy): {}", strategy, command));

        let outcome = invoker::invoke(&command, self.config.compile_timeout).await;
        let (stdout, stderr) = outcome.output();
        job.append_output(stdout, stderr);

        if artifact_exists(&job.artifact_path).await {
            return self.succeed(job, owned, Fidelity::Compiled).await;
        }

        let (primary_kind, primary_detail) = self.classify_primary(job, &outcome);
        job.log_warning(primary_detail.clone());

        let Some(fallback) = self.fallback.as_ref() else {
            return self.fail(job, primary_kind, primary_detail, None);
        };

        job.advance(JobStage::InvokingFallback);
        job.log_info(format!("Trying {} fallback", fallback.name()));
        info!("Job {}: primary failed ({}), trying fallback", job.id, primary_kind);

        match fallback.compile(&job.source_path, &job.artifact_path).await {
            FallbackOutcome::Produced { log } => {
                if artifact_exists(&job.artifact_path).await {
                    job.log_info(log);
                    self.succeed(job, owned, Fidelity::Fallback).await
                } else {
                    let detail = "Alternative compilation reported success but produced no artifact";
                    job.log_error(detail);
                    self.fail(job, ErrorKind::FallbackFailure, detail, Some(primary_kind))
                }
            }
            FallbackOutcome::Failed { detail } => {
                job.log_error(detail.clone());
                self.fail(job, ErrorKind::FallbackFailure, detail, Some(primary_kind))
            }
        }
    }

    fn classify_primary(
        &self,
        job: &CompileJob,
        outcome: &InvocationOutcome,
    ) -> (ErrorKind, String) {
        match outcome {
            InvocationOutcome::SpawnFailed { detail } => (ErrorKind::SpawnFailure, detail.clone()),
            InvocationOutcome::TimedOut { .. } => (
                ErrorKind::Timeout,
                format!(
                    "Compilation timeout ({} seconds)",
                    self.config.compile_timeout.as_secs_f64()
                ),
            ),
            InvocationOutcome::Completed { exit_code, .. } => {
                let code = exit_code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                (
                    ErrorKind::ArtifactMissing,
                    format!(
                        "Compiler exited with code {} without producing {}",
                        code,
                        file_name(&job.artifact_path)
                    ),
                )
            }
        }
    }

    async fn succeed(
        &self,
        job: &mut CompileJob,
        owned: &mut JobFiles,
        fidelity: Fidelity,
    ) -> CompileResult {
        let size = match tokio::fs::metadata(&job.artifact_path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                let detail = format!("Post-compilation check failed: {}", e);
                job.log_error(detail.clone());
                return self.fail(job, ErrorKind::Unexpected, detail, None);
            }
        };

        job.advance(JobStage::Succeeded);

        let retain_until = self.cleanup.schedule(
            job.id,
            job.artifact_path.clone(),
            job.output_dir().to_path_buf(),
            self.config.artifact_grace,
        );
        owned.keep_job_dir();

        CompileResult::Succeeded(CompiledArtifact {
            job_id: job.id,
            path: job.artifact_path.clone(),
            size,
            fidelity,
            retain_until,
            logs: job.logs(),
        })
    }

    fn fail(
        &self,
        job: &mut CompileJob,
        kind: ErrorKind,
        detail: impl Into<String>,
        primary_failure: Option<ErrorKind>,
    ) -> CompileResult {
        job.advance(JobStage::Failed);

        CompileResult::Failed(CompileFailure {
            kind,
            detail: detail.into(),
            primary_failure,
            logs: job.logs(),
        })
    }
}

async fn artifact_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Filesystem entries owned by a running job
///
/// `release` deletes them once the job is done. If the job never gets there
/// (panic, dropped future), `Drop` removes whatever is left synchronously.
struct JobFiles {
    source: Option<PathBuf>,
    job_dir: Option<PathBuf>,
}

impl JobFiles {
    fn new(source: PathBuf, job_dir: PathBuf) -> Self {
        Self {
            source: Some(source),
            job_dir: Some(job_dir),
        }
    }

    /// The job directory now belongs to the cleanup registry
    fn keep_job_dir(&mut self) {
        self.job_dir = None;
    }

    async fn release(mut self) {
        if let Some(source) = self.source.take() {
            files::discard(&source).await;
        }
        if let Some(dir) = self.job_dir.take() {
            files::discard_dir(&dir).await;
        }
    }
}

impl Drop for JobFiles {
    fn drop(&mut self) {
        if let Some(source) = self.source.take() {
            match std::fs::remove_file(&source) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to clean up {} on drop: {}", source.display(), e),
            }
        }
        if let Some(dir) = self.job_dir.take() {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to clean up {} on drop: {}", dir.display(), e),
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::{Workspace, scripts};
    use mqlc_core::domain::strategy::CompilerStrategy;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_expert_compiles_with_mock_compiler() {
        let ws = Workspace::new();
        let orchestrator = ws.mock_orchestrator(scripts::WRITES_ARTIFACT);
        let upload = ws.upload("expert.mq5", "void OnTick()\n{\n}\n");
        let source = upload.path.clone();

        let result = orchestrator.run(upload).await;

        let artifact = result.artifact().expect("compilation should succeed");
        assert!(artifact.path.ends_with("expert.ex5"));
        assert!(artifact.size > 0);
        assert_eq!(artifact.fidelity, Fidelity::Compiled);
        assert!(artifact.path.exists());
        assert!(!source.exists());
        assert!(artifact.logs.stdout.contains("0 errors"));

        // Artifact stays until the registry expires it
        let pending = orchestrator.cleanup_registry().lookup(artifact.job_id).unwrap();
        assert_eq!(pending.artifact_path, artifact.path);
    }

    #[tokio::test]
    async fn test_exit_code_does_not_decide_success() {
        let ws = Workspace::new();
        let orchestrator = ws.emulated_orchestrator(scripts::WRITES_ARTIFACT_EXITS_NONZERO, true);
        let upload = ws.upload("robot.mq4", "#property strict\n");

        let result = orchestrator.run(upload).await;

        assert_eq!(result.artifact().unwrap().fidelity, Fidelity::Compiled);
        assert_eq!(
            strategy::select(&orchestrator.config().compiler_path, orchestrator.config().platform),
            CompilerStrategy::Emulation
        );
    }

    #[tokio::test]
    async fn test_invalid_extension_never_spawns() {
        let ws = Workspace::new();
        let orchestrator = ws.emulated_orchestrator(scripts::TOUCHES_MARKER, true);
        let upload = ws.upload("notes.txt", "#property strict\nvoid OnTick() {}\n");
        let source = upload.path.clone();

        let result = orchestrator.run(upload).await;

        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::InvalidInput);
        assert_eq!(failure.detail, "Invalid MQ5 file format");
        assert!(!ws.marker().exists(), "compiler must not be spawned");
        assert!(!source.exists());
        assert_eq!(ws.output_entries(), 0);
    }

    #[tokio::test]
    async fn test_missing_marker_is_invalid() {
        let ws = Workspace::new();
        let orchestrator = ws.emulated_orchestrator(scripts::TOUCHES_MARKER, true);
        let upload = ws.upload("empty.mq5", "int x = 1;");

        let result = orchestrator.run(upload).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::InvalidInput));
        assert!(!ws.marker().exists());
    }

    #[tokio::test]
    async fn test_no_artifact_falls_back() {
        let ws = Workspace::new();
        let orchestrator = ws.emulated_orchestrator(scripts::WRITES_NOTHING, true);
        let upload = ws.upload("expert.mq5", "void OnTick() {}");
        let source = upload.path.clone();

        let result = orchestrator.run(upload).await;

        let artifact = result.artifact().expect("fallback should succeed");
        assert_eq!(artifact.fidelity, Fidelity::Fallback);
        assert_eq!(std::fs::read(&artifact.path).unwrap(), b"void OnTick() {}");
        assert!(!source.exists());
        assert!(
            artifact
                .logs
                .events
                .iter()
                .any(|e| e.message.contains("Trying copy fallback"))
        );
    }

    #[tokio::test]
    async fn test_no_artifact_without_fallback_fails() {
        let ws = Workspace::new();
        let orchestrator = ws.emulated_orchestrator(scripts::WRITES_NOTHING, false);
        let upload = ws.upload("expert.mq5", "void OnTick() {}");
        let source = upload.path.clone();

        let result = orchestrator.run(upload).await;

        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::ArtifactMissing);
        assert_eq!(failure.primary_failure, None);
        assert!(failure.logs.stdout.contains("nothing to see"));
        assert!(!source.exists());
        assert_eq!(ws.output_entries(), 0);
    }

    #[tokio::test]
    async fn test_nonexistent_compiler_spawn_failure_then_fallback() {
        let ws = Workspace::new();
        let mut config = ws.config();
        config.compiler_path = ws.root().join("missing").join("metaeditor64.exe");
        let orchestrator = JobOrchestrator::new(Arc::new(config), Arc::new(CleanupRegistry::new()));
        let upload = ws.upload("expert.mq5", "void OnTick() {}");

        let result = orchestrator.run(upload).await;

        let artifact = result.artifact().expect("fallback should succeed");
        assert_eq!(artifact.fidelity, Fidelity::Fallback);
        assert!(
            artifact
                .logs
                .events
                .iter()
                .any(|e| e.message.contains("Failed to start compiler"))
        );
    }

    #[tokio::test]
    async fn test_nonexistent_compiler_without_fallback() {
        let ws = Workspace::new();
        let mut config = ws.config();
        config.compiler_path = ws.root().join("missing").join("metaeditor64.exe");
        config.fallback_enabled = false;
        let orchestrator = JobOrchestrator::new(Arc::new(config), Arc::new(CleanupRegistry::new()));

        let result = orchestrator.run(ws.upload("expert.mq5", "OnInit")).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::SpawnFailure));
        assert_eq!(ws.output_entries(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_bounded_and_falls_back() {
        let ws = Workspace::new();
        let mut config = ws.emulated_config(scripts::HANGS);
        config.compile_timeout = Duration::from_millis(300);
        let orchestrator = JobOrchestrator::new(Arc::new(config), Arc::new(CleanupRegistry::new()));

        let started = Instant::now();
        let result = orchestrator.run(ws.upload("slow.mq5", "OnStart")).await;

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(result.artifact().unwrap().fidelity, Fidelity::Fallback);
    }

    #[tokio::test]
    async fn test_timeout_without_fallback() {
        let ws = Workspace::new();
        let mut config = ws.emulated_config(scripts::HANGS);
        config.compile_timeout = Duration::from_millis(300);
        config.fallback_enabled = false;
        let orchestrator = JobOrchestrator::new(Arc::new(config), Arc::new(CleanupRegistry::new()));

        let result = orchestrator.run(ws.upload("slow.mq5", "OnStart")).await;

        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::Timeout);
        assert!(failure.logs.stdout.contains("still compiling"));
    }

    #[tokio::test]
    async fn test_fallback_failure_keeps_primary_classification() {
        struct BrokenFallback;

        #[async_trait::async_trait]
        impl FallbackCompiler for BrokenFallback {
            fn name(&self) -> &'static str {
                "broken"
            }

            async fn compile(&self, _source: &Path, _artifact: &Path) -> FallbackOutcome {
                FallbackOutcome::Failed {
                    detail: "Alternative compilation failed".to_string(),
                }
            }
        }

        let ws = Workspace::new();
        let orchestrator = ws
            .emulated_orchestrator(scripts::WRITES_NOTHING, true)
            .with_fallback(Some(Arc::new(BrokenFallback)));
        let upload = ws.upload("expert.mq5", "OnTick");
        let source = upload.path.clone();

        let result = orchestrator.run(upload).await;

        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::FallbackFailure);
        assert_eq!(failure.primary_failure, Some(ErrorKind::ArtifactMissing));
        assert!(!source.exists());
        assert_eq!(ws.output_entries(), 0);
    }

    #[tokio::test]
    async fn test_same_source_twice_runs_independently() {
        let ws = Workspace::new();
        let orchestrator = ws.emulated_orchestrator(scripts::WRITES_ARTIFACT, false);

        let first = orchestrator.run(ws.upload("expert.mq5", "OnTick")).await;
        let second = orchestrator.run(ws.upload("expert.mq5", "OnTick")).await;

        let (first, second) = (first.artifact().unwrap(), second.artifact().unwrap());
        assert_ne!(first.job_id, second.job_id);
        assert_ne!(first.path, second.path);
        assert!(first.path.exists() && second.path.exists());
    }

    #[tokio::test]
    async fn test_panicking_fallback_becomes_unexpected() {
        struct PanickingFallback;

        #[async_trait::async_trait]
        impl FallbackCompiler for PanickingFallback {
            fn name(&self) -> &'static str {
                "panicking"
            }

            async fn compile(&self, _source: &Path, _artifact: &Path) -> FallbackOutcome {
                panic!("fallback exploded");
            }
        }

        let ws = Workspace::new();
        let orchestrator = ws
            .emulated_orchestrator(scripts::WRITES_NOTHING, true)
            .with_fallback(Some(Arc::new(PanickingFallback)));
        let upload = ws.upload("expert.mq5", "OnTick");
        let source = upload.path.clone();

        let result = orchestrator.run_isolated(upload).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::Unexpected));
        assert!(!source.exists());
        assert_eq!(ws.output_entries(), 0);
    }
}
