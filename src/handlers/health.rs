use crate::{db, handlers::AppState, ApiResponse};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::time::Instant;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthStatus {
    /// `up` when the database answers, `degraded` otherwise
    pub status: String,
    pub version: String,
    pub database: String,
    pub database_latency_ms: u64,
    pub timestamp: String,
}

/// Liveness plus a database ping
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database are reachable", body = ApiResponse<HealthStatus>),
        (status = 503, description = "Database unreachable", body = ApiResponse<HealthStatus>)
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let database_ok = db::check_connection(&state.db).await.is_ok();
    let latency = start.elapsed().as_millis() as u64;

    let body = HealthStatus {
        status: if database_ok { "up" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database_ok { "up" } else { "down" }.to_string(),
        database_latency_ms: latency,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    let status = if database_ok {
        StatusCode::OK
    } else {
        tracing::warn!("Health check: database unreachable");
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ApiResponse::success(body)))
}
