//! Compile job domain types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::domain::log::{LogEntry, LogLevel};
use crate::domain::result::CapturedLogs;
use crate::domain::strategy::CompilerStrategy;

/// Extension given to compiled artifacts
pub const ARTIFACT_EXTENSION: &str = "ex5";

/// A source file already received on local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUpload {
    /// Transient copy owned by the job; deleted when the job completes
    pub path: PathBuf,
    /// Name the caller submitted the file under
    pub original_name: String,
}

impl SourceUpload {
    pub fn new(path: impl Into<PathBuf>, original_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
        }
    }
}

/// Position of a job in the orchestrator state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Validating,
    InvokingPrimary,
    InvokingFallback,
    Succeeded,
    Failed,
}

impl JobStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStage::Succeeded | JobStage::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_advance_to(self, next: JobStage) -> bool {
        use JobStage::*;
        matches!(
            (self, next),
            (Validating, InvokingPrimary)
                | (Validating, Failed)
                | (InvokingPrimary, Succeeded)
                | (InvokingPrimary, InvokingFallback)
                | (InvokingPrimary, Failed)
                | (InvokingFallback, Succeeded)
                | (InvokingFallback, Failed)
        )
    }
}

/// One compilation attempt for one source file
#[derive(Debug, Clone)]
pub struct CompileJob {
    pub id: Uuid,
    pub source_path: PathBuf,
    pub original_name: String,
    /// Where the artifact is expected; exists only after success
    pub artifact_path: PathBuf,
    pub stage: JobStage,
    pub strategy: Option<CompilerStrategy>,
    pub stdout: String,
    pub stderr: String,
    pub events: Vec<LogEntry>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl CompileJob {
    /// Creates a job whose artifact lands in its own directory under `output_root`
    ///
    /// The per-job directory keeps concurrent jobs for identically named sources
    /// from clobbering each other while the artifact keeps its derived name.
    pub fn new(upload: &SourceUpload, output_root: &Path) -> Self {
        let id = Uuid::new_v4();
        let artifact_path = output_root
            .join(id.to_string())
            .join(artifact_file_name(&upload.original_name));

        Self {
            id,
            source_path: upload.path.clone(),
            original_name: upload.original_name.clone(),
            artifact_path,
            stage: JobStage::Validating,
            strategy: None,
            stdout: String::new(),
            stderr: String::new(),
            events: Vec::new(),
            created_at: chrono::Utc::now(),
        }
    }

    /// Directory owned by this job that holds the artifact
    pub fn output_dir(&self) -> &Path {
        self.artifact_path.parent().unwrap_or(Path::new("."))
    }

    /// Moves the job to `next`, returning false when the transition is not allowed
    pub fn advance(&mut self, next: JobStage) -> bool {
        if !self.stage.can_advance_to(next) {
            return false;
        }
        self.stage = next;
        true
    }

    pub fn record(&mut self, level: LogLevel, message: impl Into<String>) {
        self.events.push(LogEntry::now(level, message));
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.record(LogLevel::Info, message);
    }

    pub fn log_warning(&mut self, message: impl Into<String>) {
        self.record(LogLevel::Warning, message);
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.record(LogLevel::Error, message);
    }

    /// Appends output captured from one invocation
    pub fn append_output(&mut self, stdout: &str, stderr: &str) {
        append_block(&mut self.stdout, stdout);
        append_block(&mut self.stderr, stderr);
    }

    /// Snapshot of everything captured so far
    pub fn logs(&self) -> CapturedLogs {
        CapturedLogs {
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
            events: self.events.clone(),
        }
    }
}

fn append_block(target: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !target.is_empty() && !target.ends_with('\n') {
        target.push('\n');
    }
    target.push_str(text);
}

/// Derives the artifact name: source base name with its extension swapped for `.ex5`
pub fn artifact_file_name(original_name: &str) -> String {
    let base = Path::new(original_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "unnamed".to_string());

    format!("{}.{}", base, ARTIFACT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_file_name() {
        assert_eq!(artifact_file_name("expert.mq5"), "expert.ex5");
        assert_eq!(artifact_file_name("indicator.mq4"), "indicator.ex5");
        assert_eq!(artifact_file_name("my.robot.mq5"), "my.robot.ex5");
        assert_eq!(artifact_file_name("noext"), "noext.ex5");
        assert_eq!(artifact_file_name(""), "unnamed.ex5");
    }

    #[test]
    fn test_new_job_uses_per_job_directory() {
        let upload = SourceUpload::new("/tmp/uploads/expert-1-2.mq5", "expert.mq5");
        let first = CompileJob::new(&upload, Path::new("/srv/compiled"));
        let second = CompileJob::new(&upload, Path::new("/srv/compiled"));

        assert!(first.artifact_path.ends_with("expert.ex5"));
        assert_eq!(
            first.output_dir(),
            Path::new("/srv/compiled").join(first.id.to_string())
        );
        assert_ne!(first.artifact_path, second.artifact_path);
        assert_eq!(first.stage, JobStage::Validating);
    }

    #[test]
    fn test_state_machine_transitions() {
        let upload = SourceUpload::new("/tmp/a.mq5", "a.mq5");
        let mut job = CompileJob::new(&upload, Path::new("/tmp/out"));

        assert!(!job.advance(JobStage::InvokingFallback));
        assert!(job.advance(JobStage::InvokingPrimary));
        assert!(job.advance(JobStage::InvokingFallback));
        assert!(job.advance(JobStage::Failed));
        assert!(job.stage.is_terminal());

        // Terminal states never move again
        assert!(!job.advance(JobStage::Succeeded));
        assert_eq!(job.stage, JobStage::Failed);
    }

    #[test]
    fn test_append_output_separates_invocations() {
        let upload = SourceUpload::new("/tmp/a.mq5", "a.mq5");
        let mut job = CompileJob::new(&upload, Path::new("/tmp/out"));

        job.append_output("first run", "");
        job.append_output("second run\n", "oops");

        assert_eq!(job.stdout, "first run\nsecond run\n");
        assert_eq!(job.stderr, "oops");

        job.log_warning("primary produced no artifact");
        let logs = job.logs();
        assert_eq!(logs.events.len(), 1);
        assert_eq!(logs.events[0].level, LogLevel::Warning);
    }
}
