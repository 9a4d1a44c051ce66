//! Health Check API Handler
//!
//! Health check endpoint for monitoring.

use axum::{Json, extract::State};
use mqlc_core::dto::health::HealthStatus;

use crate::state::AppState;

/// GET /health
/// Reports liveness and whether the compiler executable is installed
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::ok(state.compiler().compiler_available().await))
}
