use crate::{
    entities::notification,
    errors::ErrorResponse,
    handlers::{common::PaginationParams, AppState},
    services::notifications::{NotificationFilter, ReorderScanSummary, UnreadCount},
    ApiResponse, ApiResult, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkedRead {
    pub updated: u64,
}

/// List notifications, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationFilter, PaginationParams),
    responses(
        (status = 200, description = "Page of notifications", body = ApiResponse<PaginatedResponse<notification::Model>>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(filter): Query<NotificationFilter>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<notification::Model>> {
    let page = pagination.resolve(&state.config);
    let notifications = state.services.notifications.list(filter, page).await?;
    Ok(Json(ApiResponse::success(notifications)))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    responses(
        (status = 200, description = "Unread notifications", body = ApiResponse<UnreadCount>)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn unread_count(State(state): State<AppState>) -> ApiResult<UnreadCount> {
    let count = state.services.notifications.unread_count().await?;
    Ok(Json(ApiResponse::success(count)))
}

#[utoipa::path(
    put,
    path = "/api/notifications/read-all",
    responses(
        (status = 200, description = "All notifications marked read", body = ApiResponse<MarkedRead>)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_all_read(State(state): State<AppState>) -> ApiResult<MarkedRead> {
    let updated = state.services.notifications.mark_all_read().await?;
    Ok(Json(ApiResponse::success(MarkedRead { updated })))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    params(("id" = i32, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification marked read", body = ApiResponse<notification::Model>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<notification::Model> {
    let notification = state.services.notifications.mark_read(id).await?;
    Ok(Json(ApiResponse::success(notification)))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    params(("id" = i32, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification deleted"),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    state.services.notifications.delete(id).await?;
    Ok(Json(ApiResponse::message("Notification deleted")))
}

/// Raise `reorder_required` notifications for every product at or below its reorder level
#[utoipa::path(
    post,
    path = "/api/notifications/reorder-scan",
    responses(
        (status = 200, description = "Scan finished", body = ApiResponse<ReorderScanSummary>),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn reorder_scan(State(state): State<AppState>) -> ApiResult<ReorderScanSummary> {
    let summary = state.services.notifications.reorder_scan().await?;
    Ok(Json(ApiResponse::success(summary)))
}
