//! Compile DTOs

use serde::{Deserialize, Serialize};

use crate::domain::batch::{BatchEntry, BatchResult};
use crate::domain::result::{CompileResult, ErrorKind, Fidelity};

/// Response header carrying the fidelity of a single-file compile
pub const FIDELITY_HEADER: &str = "x-compile-fidelity";

/// JSON error body returned by every failing endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Default::default()
        }
    }
}

/// One file of a batch report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFileReport {
    pub filename: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    /// Relative URL the artifact can be fetched from until it expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fidelity: Option<Fidelity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl BatchFileReport {
    /// Flattens a batch entry into its wire form
    pub fn from_entry(entry: &BatchEntry) -> Self {
        match &entry.result {
            CompileResult::Succeeded(artifact) => {
                let output_file = artifact.file_name();
                Self {
                    filename: entry.file_name.clone(),
                    success: true,
                    error: None,
                    kind: None,
                    logs: None,
                    download_url: Some(download_path(&artifact.job_id.to_string(), &output_file)),
                    output_file: Some(output_file),
                    fidelity: Some(artifact.fidelity),
                    size: Some(artifact.size),
                }
            }
            CompileResult::Failed(failure) => Self {
                filename: entry.file_name.clone(),
                success: false,
                error: Some(failure.detail.clone()),
                kind: Some(failure.kind),
                logs: (!failure.logs.is_empty()).then(|| failure.logs.render()),
                output_file: None,
                download_url: None,
                fidelity: None,
                size: None,
            },
        }
    }
}

/// Body of `POST /compile-batch`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub message: String,
    pub results: Vec<BatchFileReport>,
    pub total_files: usize,
    pub successful_compilations: usize,
}

impl From<&BatchResult> for BatchReport {
    fn from(batch: &BatchResult) -> Self {
        Self {
            message: "Batch compilation completed".to_string(),
            results: batch.entries.iter().map(BatchFileReport::from_entry).collect(),
            total_files: batch.total_files,
            successful_compilations: batch.successful_compilations,
        }
    }
}

/// Route an artifact is served from while its retention window is open
pub fn download_path(job_id: &str, file_name: &str) -> String {
    format!("/compiled/{}/{}", job_id, file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::{CapturedLogs, CompiledArtifact};
    use std::path::PathBuf;
    use uuid::Uuid;

    #[test]
    fn test_batch_report_wire_shape() {
        let job_id = Uuid::new_v4();
        let batch = BatchResult::from_entries(vec![
            BatchEntry {
                file_name: "expert.mq5".to_string(),
                result: CompileResult::Succeeded(CompiledArtifact {
                    job_id,
                    path: PathBuf::from(format!("compiled/{}/expert.ex5", job_id)),
                    size: 128,
                    fidelity: Fidelity::Fallback,
                    retain_until: chrono::Utc::now(),
                    logs: CapturedLogs::default(),
                }),
            },
            BatchEntry {
                file_name: "notes.txt".to_string(),
                result: CompileResult::failed(ErrorKind::InvalidInput, "Invalid file format"),
            },
        ]);

        let json = serde_json::to_value(BatchReport::from(&batch)).unwrap();
        assert_eq!(json["totalFiles"], 2);
        assert_eq!(json["successfulCompilations"], 1);

        let first = &json["results"][0];
        assert_eq!(first["success"], true);
        assert_eq!(first["outputFile"], "expert.ex5");
        assert_eq!(first["fidelity"], "fallback");
        assert_eq!(
            first["downloadUrl"],
            format!("/compiled/{}/expert.ex5", job_id)
        );
        assert!(first.get("error").is_none());

        let second = &json["results"][1];
        assert_eq!(second["success"], false);
        assert_eq!(second["kind"], "invalid_input");
        assert_eq!(second["error"], "Invalid file format");
        assert!(second.get("logs").is_none());
    }

    #[test]
    fn test_error_body_skips_empty_fields() {
        let json = serde_json::to_value(ErrorBody::new("No file uploaded")).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "No file uploaded" }));
    }
}
