use crate::{
    errors::ErrorResponse,
    handlers::AppState,
    services::reports::{
        CategoryBreakdown, InventorySummary, LowStockItem, StockMovementReport, TopMover,
    },
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

const DEFAULT_REPORT_DAYS: i64 = 30;
const DEFAULT_TOP_MOVERS: u64 = 10;

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportWindow {
    /// Look-back window in days, 1-365 (default 30)
    pub days: Option<i64>,
    /// Number of products to return, 1-100 (default 10; top movers only)
    pub limit: Option<u64>,
}

impl ReportWindow {
    fn days(&self) -> i64 {
        self.days.unwrap_or(DEFAULT_REPORT_DAYS)
    }
}

#[utoipa::path(
    get,
    path = "/api/reports/inventory-summary",
    responses(
        (status = 200, description = "Stock totals", body = ApiResponse<InventorySummary>),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn inventory_summary(State(state): State<AppState>) -> ApiResult<InventorySummary> {
    let summary = state.services.reports.inventory_summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}

#[utoipa::path(
    get,
    path = "/api/reports/low-stock",
    responses(
        (status = 200, description = "Products at or below reorder level, lowest quantity first", body = ApiResponse<Vec<LowStockItem>>),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn low_stock_report(State(state): State<AppState>) -> ApiResult<Vec<LowStockItem>> {
    let items = state.services.reports.low_stock().await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/reports/category-breakdown",
    responses(
        (status = 200, description = "Totals per category", body = ApiResponse<Vec<CategoryBreakdown>>),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn category_breakdown(
    State(state): State<AppState>,
) -> ApiResult<Vec<CategoryBreakdown>> {
    let breakdown = state.services.reports.category_breakdown().await?;
    Ok(Json(ApiResponse::success(breakdown)))
}

#[utoipa::path(
    get,
    path = "/api/reports/stock-movements",
    params(ReportWindow),
    responses(
        (status = 200, description = "Movements per operation type", body = ApiResponse<StockMovementReport>),
        (status = 400, description = "Invalid window", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn stock_movements(
    State(state): State<AppState>,
    Query(window): Query<ReportWindow>,
) -> ApiResult<StockMovementReport> {
    let report = state.services.reports.stock_movements(window.days()).await?;
    Ok(Json(ApiResponse::success(report)))
}

#[utoipa::path(
    get,
    path = "/api/reports/top-movers",
    params(ReportWindow),
    responses(
        (status = 200, description = "Most frequently adjusted products", body = ApiResponse<Vec<TopMover>>),
        (status = 400, description = "Invalid window or limit", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn top_movers(
    State(state): State<AppState>,
    Query(window): Query<ReportWindow>,
) -> ApiResult<Vec<TopMover>> {
    let movers = state
        .services
        .reports
        .top_movers(window.days(), window.limit.unwrap_or(DEFAULT_TOP_MOVERS))
        .await?;
    Ok(Json(ApiResponse::success(movers)))
}
