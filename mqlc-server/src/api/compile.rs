//! Compile API Handlers
//!
//! Multipart upload endpoints and artifact downloads.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use mqlc_compiler::files;
use mqlc_core::domain::job::SourceUpload;
use mqlc_core::domain::result::{CompileResult, Fidelity};
use mqlc_core::dto::compile::{BatchReport, FIDELITY_HEADER};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Multipart field carrying the file of a single compile
pub const SINGLE_FIELD: &str = "mq5file";

/// Multipart field carrying the files of a batch
pub const BATCH_FIELD: &str = "mq5files";

/// POST /compile
/// Compile one uploaded file and return the artifact bytes
pub async fn compile(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Response> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(SINGLE_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await?;
        check_size(&state, &name, bytes.len())?;

        upload = Some(files::stage_upload(&state.config.upload_dir, &name, &bytes).await?);
        break;
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
    tracing::info!("Compiling: {}", upload.original_name);

    match state.jobs.run_isolated(upload).await {
        CompileResult::Succeeded(artifact) => {
            let bytes = tokio::fs::read(&artifact.path).await;
            // Delivered (or unreadable): either way the artifact can go
            state.cleanup.expedite(artifact.job_id);

            let bytes = bytes.map_err(|e| {
                ApiError::InternalError(format!("Failed to read compiled file: {}", e))
            })?;

            Ok(artifact_response(
                &artifact.file_name(),
                bytes,
                Some(artifact.fidelity),
            ))
        }
        CompileResult::Failed(failure) => Err(ApiError::CompileFailed(failure)),
    }
}

/// POST /compile-batch
/// Compile every uploaded file and report per-file results
pub async fn compile_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<BatchReport>> {
    let mut uploads = Vec::new();

    if let Err(e) = collect_batch(&state, &mut multipart, &mut uploads).await {
        for upload in &uploads {
            files::discard(&upload.path).await;
        }
        return Err(e);
    }

    if uploads.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".to_string()));
    }

    tracing::info!("Batch compiling {} file(s)", uploads.len());

    let result = state.batch.run(uploads).await;
    Ok(Json(BatchReport::from(&result)))
}

async fn collect_batch(
    state: &AppState,
    multipart: &mut Multipart,
    uploads: &mut Vec<SourceUpload>,
) -> ApiResult<()> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(BATCH_FIELD) {
            continue;
        }

        if uploads.len() >= state.config.max_batch_files {
            return Err(ApiError::BadRequest(format!(
                "Too many files (max {})",
                state.config.max_batch_files
            )));
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await?;
        check_size(state, &name, bytes.len())?;

        uploads.push(files::stage_upload(&state.config.upload_dir, &name, &bytes).await?);
    }

    Ok(())
}

/// GET /compiled/{job_id}/{file_name}
/// Serve an artifact while its retention window is open
pub async fn download(
    State(state): State<AppState>,
    Path((job_id, file_name)): Path<(String, String)>,
) -> ApiResult<Response> {
    let not_found = || ApiError::NotFound("Compiled file not found or expired".to_string());

    let job_id = Uuid::parse_str(&job_id).map_err(|_| not_found())?;
    let pending = state.cleanup.lookup(job_id).ok_or_else(not_found)?;

    let matches_name = pending
        .artifact_path
        .file_name()
        .is_some_and(|name| name == file_name.as_str());
    if !matches_name {
        return Err(not_found());
    }

    let bytes = tokio::fs::read(&pending.artifact_path)
        .await
        .map_err(|_| not_found())?;
    state.cleanup.expedite(job_id);

    Ok(artifact_response(&file_name, bytes, None))
}

fn check_size(state: &AppState, name: &str, len: usize) -> ApiResult<()> {
    if len > state.config.max_upload_bytes {
        tracing::warn!("Rejected {}: {} exceeds the upload limit", name, files::format_file_size(len as u64));
        return Err(ApiError::PayloadTooLarge(format!(
            "File too large (max {})",
            files::format_file_size(state.config.max_upload_bytes as u64)
        )));
    }
    Ok(())
}

/// `attachment; filename="..."` restricted to characters a header value can carry
fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

fn artifact_response(file_name: &str, bytes: Vec<u8>, fidelity: Option<Fidelity>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    if let Ok(value) = HeaderValue::from_str(&content_disposition(file_name)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if let Some(fidelity) = fidelity {
        if let Ok(value) = HeaderValue::from_str(&fidelity.to_string()) {
            headers.insert(HeaderName::from_static(FIDELITY_HEADER), value);
        }
    }

    (StatusCode::OK, headers, bytes).into_response()
}
