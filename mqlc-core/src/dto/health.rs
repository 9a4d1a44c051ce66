//! Health DTOs

use serde::{Deserialize, Serialize};

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Whether the configured compiler executable was found on disk
    #[serde(default)]
    pub compiler_available: bool,
}

impl HealthStatus {
    pub fn ok(compiler_available: bool) -> Self {
        Self {
            status: "OK".to_string(),
            timestamp: chrono::Utc::now(),
            compiler_available,
        }
    }
}
