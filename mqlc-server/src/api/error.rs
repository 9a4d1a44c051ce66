//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mqlc_compiler::StagingError;
use mqlc_core::domain::result::{CompileFailure, ErrorKind};
use mqlc_core::dto::compile::ErrorBody;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    PayloadTooLarge(String),
    /// A compile job ended in failure
    CompileFailed(CompileFailure),
    Multipart(MultipartError),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::new(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new(msg)),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, ErrorBody::new(msg))
            }
            ApiError::CompileFailed(failure) => {
                (StatusCode::BAD_REQUEST, compile_failure_body(failure))
            }
            ApiError::Multipart(err) => {
                let status = err.status();
                if status == StatusCode::PAYLOAD_TOO_LARGE {
                    (status, ErrorBody::new("File too large"))
                } else {
                    (status, ErrorBody::new(err.body_text()))
                }
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::new(msg))
            }
        };

        (status, Json(body)).into_response()
    }
}

fn compile_failure_body(failure: CompileFailure) -> ErrorBody {
    if failure.kind == ErrorKind::InvalidInput {
        return ErrorBody {
            kind: Some(failure.kind),
            ..ErrorBody::new("Invalid MQ5 file format")
        };
    }

    ErrorBody {
        error: "Compilation failed".to_string(),
        kind: Some(failure.kind),
        logs: (!failure.logs.is_empty()).then(|| failure.logs.render()),
        details: Some(failure.detail),
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Multipart(err)
    }
}

impl From<StagingError> for ApiError {
    fn from(err: StagingError) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
