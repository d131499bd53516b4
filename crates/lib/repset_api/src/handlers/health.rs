//! Liveness endpoint.

use axum::Json;

use crate::models::HealthResponse;

/// `GET /health` — report liveness and the library version.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: repset_core::version().to_string(),
    })
}
