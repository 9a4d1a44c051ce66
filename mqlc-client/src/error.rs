//! Error types for the compile service client

use mqlc_core::dto::compile::ErrorBody;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the compile service client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
        /// Structured body, when the server sent one
        body: Option<ErrorBody>,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// A local file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Create an API error from status code and response text
    ///
    /// JSON error bodies are decoded; anything else is kept verbatim.
    pub fn api_error(status: u16, text: impl Into<String>) -> Self {
        let text = text.into();
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => {
                let message = match &body.details {
                    Some(details) => format!("{}: {}", body.error, details),
                    None => body.error.clone(),
                };
                Self::ApiError {
                    status,
                    message,
                    body: Some(body),
                }
            }
            Err(_) => Self::ApiError {
                status,
                message: text,
                body: None,
            },
        }
    }

    /// Compiler logs attached to a failed compilation
    pub fn logs(&self) -> Option<&str> {
        match self {
            Self::ApiError {
                body: Some(body), ..
            } => body.logs.as_deref(),
            _ => None,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}
