use crate::{
    errors::ErrorResponse,
    handlers::{common::PaginationParams, AppState},
    services::audit::{AuditEntry, AuditFilter, PurgeSummary},
    ApiResponse, ApiResult, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PurgeParams {
    /// Defaults to the configured retention period
    pub older_than_days: Option<i64>,
}

/// Audit trail with optional product, user, operation and date filters
#[utoipa::path(
    get,
    path = "/api/audit",
    params(AuditFilter, PaginationParams),
    responses(
        (status = 200, description = "Page of audit entries", body = ApiResponse<PaginatedResponse<AuditEntry>>),
        (status = 400, description = "Invalid filter", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Audit"
)]
pub async fn list_audit(
    State(state): State<AppState>,
    Query(filter): Query<AuditFilter>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<AuditEntry>> {
    let page = pagination.resolve(&state.config);
    let entries = state.services.audit.list(filter, page).await?;
    Ok(Json(ApiResponse::success(entries)))
}

#[utoipa::path(
    get,
    path = "/api/audit/{id}",
    params(("id" = i32, Path, description = "Audit entry id")),
    responses(
        (status = 200, description = "Audit entry", body = ApiResponse<AuditEntry>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Audit"
)]
pub async fn get_audit(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<AuditEntry> {
    let entry = state.services.audit.get(id).await?;
    Ok(Json(ApiResponse::success(entry)))
}

#[utoipa::path(
    delete,
    path = "/api/audit/purge",
    params(PurgeParams),
    responses(
        (status = 200, description = "Old entries removed", body = ApiResponse<PurgeSummary>),
        (status = 400, description = "Invalid retention", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Audit"
)]
pub async fn purge_audit(
    State(state): State<AppState>,
    Query(params): Query<PurgeParams>,
) -> ApiResult<PurgeSummary> {
    let days = params
        .older_than_days
        .unwrap_or(state.config.audit_retention_days);
    let summary = state.services.audit.purge(days).await?;
    Ok(Json(ApiResponse::success(summary)))
}
