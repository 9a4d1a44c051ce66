//! MQL Compile Client
//!
//! A simple, type-safe HTTP client for the MQL compile service.
//!
//! # Example
//!
//! ```no_run
//! use mqlc_client::CompilerClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CompilerClient::new("http://localhost:3000");
//!
//!     let compiled = client.compile_file("Experts/expert.mq5").await?;
//!     std::fs::write(&compiled.file_name, &compiled.bytes)?;
//!
//!     println!("Wrote {} ({})", compiled.file_name, compiled.fidelity);
//!     Ok(())
//! }
//! ```

mod compile;
pub mod error;
mod health;

// Re-export commonly used types
pub use compile::CompiledFile;
pub use error::{ClientError, Result};
pub use mqlc_core::dto::compile::{BatchFileReport, BatchReport};
pub use mqlc_core::dto::health::HealthStatus;

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the compile service API
#[derive(Debug, Clone)]
pub struct CompilerClient {
    /// Base URL of the service (e.g., "http://localhost:3000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl CompilerClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use mqlc_client::CompilerClient;
    ///
    /// let client = CompilerClient::new("http://localhost:3000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Turn a non-success status into an error, passing successful responses through
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }
}
