//! Compile result domain types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::log::LogEntry;

/// Machine-readable classification of a failed compile job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Wrong extension or no language marker; nothing was spawned
    InvalidInput,
    /// The compiler executable is missing or could not be started
    SpawnFailure,
    /// The wall-clock budget ran out and the process was killed
    Timeout,
    /// The process ran to completion but no artifact materialized
    ArtifactMissing,
    /// The fallback path could not produce or relabel an artifact
    FallbackFailure,
    /// Any other fault during setup, invocation or cleanup
    Unexpected,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::SpawnFailure => "spawn_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ArtifactMissing => "artifact_missing",
            ErrorKind::FallbackFailure => "fallback_failure",
            ErrorKind::Unexpected => "unexpected",
        };
        f.write_str(name)
    }
}

/// Which path produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    /// Produced by the external compiler
    Compiled,
    /// Produced by the degraded fallback (source bytes relabelled)
    Fallback,
}

impl std::fmt::Display for Fidelity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fidelity::Compiled => f.write_str("compiled"),
            Fidelity::Fallback => f.write_str("fallback"),
        }
    }
}

impl std::str::FromStr for Fidelity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compiled" => Ok(Fidelity::Compiled),
            "fallback" => Ok(Fidelity::Fallback),
            other => Err(format!("unknown fidelity: {}", other)),
        }
    }
}

/// Output captured from every invocation that ran for a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedLogs {
    pub stdout: String,
    pub stderr: String,
    pub events: Vec<LogEntry>,
}

impl CapturedLogs {
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty() && self.events.is_empty()
    }

    /// Renders the logs as a single human-readable block
    pub fn render(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&format!("[{}] {}\n", event.level, event.message));
        }
        if !self.stdout.trim().is_empty() {
            out.push_str("--- stdout ---\n");
            out.push_str(self.stdout.trim_end());
            out.push('\n');
        }
        if !self.stderr.trim().is_empty() {
            out.push_str("--- stderr ---\n");
            out.push_str(self.stderr.trim_end());
            out.push('\n');
        }
        out
    }
}

/// A produced artifact, retained until `retain_until` so the caller can fetch it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledArtifact {
    pub job_id: Uuid,
    pub path: PathBuf,
    pub size: u64,
    pub fidelity: Fidelity,
    pub retain_until: chrono::DateTime<chrono::Utc>,
    pub logs: CapturedLogs,
}

impl CompiledArtifact {
    /// File name of the artifact (`<stem>.ex5`)
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Why a job failed, plus everything captured along the way
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileFailure {
    pub kind: ErrorKind,
    pub detail: String,
    /// Classification of the primary invocation when the fallback also ran
    pub primary_failure: Option<ErrorKind>,
    pub logs: CapturedLogs,
}

/// Outcome of one compile job. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompileResult {
    Succeeded(CompiledArtifact),
    Failed(CompileFailure),
}

impl CompileResult {
    /// Builds a failure with no captured logs
    pub fn failed(kind: ErrorKind, detail: impl Into<String>) -> Self {
        CompileResult::Failed(CompileFailure {
            kind,
            detail: detail.into(),
            primary_failure: None,
            logs: CapturedLogs::default(),
        })
    }

    /// Builds an `Unexpected` failure, used when a job faults outside the state machine
    pub fn unexpected(detail: impl Into<String>) -> Self {
        Self::failed(ErrorKind::Unexpected, detail)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CompileResult::Succeeded(_))
    }

    pub fn artifact(&self) -> Option<&CompiledArtifact> {
        match self {
            CompileResult::Succeeded(artifact) => Some(artifact),
            CompileResult::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&CompileFailure> {
        match self {
            CompileResult::Succeeded(_) => None,
            CompileResult::Failed(failure) => Some(failure),
        }
    }

    /// Error classification, `None` on success
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.failure().map(|failure| failure.kind)
    }
}
