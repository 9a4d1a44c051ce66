//! API Module
//!
//! HTTP API layer for the compile service.
//! Each submodule handles endpoints for a specific concern.

pub mod compile;
pub mod error;
pub mod health;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::error::ApiError;
use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.request_body_limit();

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Compile endpoints
        .route("/compile", post(compile::compile))
        .route("/compile-batch", post(compile::compile_batch))
        .route("/compiled/{job_id}/{file_name}", get(compile::download))
        .fallback(not_found)
        // Add state and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Endpoint not found".to_string())
}
