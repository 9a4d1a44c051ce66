//! Batch domain types

use serde::{Deserialize, Serialize};

use crate::domain::result::CompileResult;

/// Result for one file of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Name the file was submitted under
    pub file_name: String,
    pub result: CompileResult,
}

/// Aggregated report for a batch; entries keep submission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub entries: Vec<BatchEntry>,
    pub total_files: usize,
    pub successful_compilations: usize,
}

impl BatchResult {
    /// Builds the report, deriving the counts from the entries
    pub fn from_entries(entries: Vec<BatchEntry>) -> Self {
        let successful_compilations = entries
            .iter()
            .filter(|entry| entry.result.is_success())
            .count();

        Self {
            total_files: entries.len(),
            successful_compilations,
            entries,
        }
    }

    pub fn failed_compilations(&self) -> usize {
        self.total_files - self.successful_compilations
    }
}
