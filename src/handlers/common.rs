use crate::{config::AppConfig, services::PageRequest, ApiResponse};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// Pagination parameters for list operations
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-based page number (default 1)
    pub page: Option<u64>,
    /// Page size, clamped to the configured maximum
    pub limit: Option<u64>,
}

impl PaginationParams {
    pub fn resolve(&self, config: &AppConfig) -> PageRequest {
        page_request(config, self.page, self.limit)
    }
}

pub fn page_request(config: &AppConfig, page: Option<u64>, limit: Option<u64>) -> PageRequest {
    PageRequest::new(page, config.page_size(limit))
}

/// 201 with the standard envelope
pub fn created_response<T: Serialize>(data: T, message: &str) -> Response {
    (
        StatusCode::CREATED,
        Json(ApiResponse::success(data).with_message(message)),
    )
        .into_response()
}
