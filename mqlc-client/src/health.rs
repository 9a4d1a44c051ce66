//! Health endpoint

use crate::CompilerClient;
use crate::error::Result;
use mqlc_core::dto::health::HealthStatus;

impl CompilerClient {
    /// Check service health
    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self.client.get(self.url("/health")).send().await?;

        self.handle_response(response).await
    }
}
