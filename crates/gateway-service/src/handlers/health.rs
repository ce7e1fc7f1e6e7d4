//! Health check handler.
//!
//! `/v1/health` is exempt from every admission stage and never touches the
//! database: failure means the process itself is unhealthy.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// Handler for GET /v1/health
#[tracing::instrument(skip_all, name = "gateway.health")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        environment: state.config.environment.clone(),
        version: state.config.service_version.clone(),
    })
}
