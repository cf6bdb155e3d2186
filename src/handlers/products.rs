use crate::{
    auth::AuthUser,
    entities::product,
    errors::{ErrorResponse, ServiceError},
    handlers::{
        common::{created_response, page_request, PaginationParams},
        AppState,
    },
    services::{
        audit::AuditEntry,
        products::{CreateProductRequest, ProductQuery, UpdateProductRequest},
        stock::{AdjustStockRequest, SetStockRequest, StockAdjustment, StockChange},
    },
    ApiResponse, ApiResult, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};

/// List products with optional search, category and low-stock filters
#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Page of products", body = ApiResponse<PaginatedResponse<product::Model>>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<PaginatedResponse<product::Model>> {
    let page = page_request(&state.config, query.page, query.limit);
    let products = state.services.products.list(query, page).await?;
    Ok(Json(ApiResponse::success(products)))
}

#[utoipa::path(
    get,
    path = "/api/products/categories",
    responses(
        (status = 200, description = "Distinct categories", body = ApiResponse<Vec<String>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let categories = state.services.products.categories().await?;
    Ok(Json(ApiResponse::success(categories)))
}

/// Products at or below their reorder level
#[utoipa::path(
    get,
    path = "/api/products/low-stock",
    responses(
        (status = 200, description = "Low stock products", body = ApiResponse<Vec<product::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn low_stock_products(State(state): State<AppState>) -> ApiResult<Vec<product::Model>> {
    let products = state.services.products.low_stock().await?;
    Ok(Json(ApiResponse::success(products)))
}

#[utoipa::path(
    get,
    path = "/api/products/sku/{sku}",
    params(("sku" = String, Path, description = "Stock keeping unit")),
    responses(
        (status = 200, description = "Product", body = ApiResponse<product::Model>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn get_product_by_sku(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> ApiResult<product::Model> {
    let product = state.services.products.get_by_sku(&sku).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = ApiResponse<product::Model>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<product::Model> {
    let product = state.services.products.get(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// Stock history of a product, newest first
#[utoipa::path(
    get,
    path = "/api/products/{id}/history",
    params(("id" = i32, Path, description = "Product id"), PaginationParams),
    responses(
        (status = 200, description = "Audit entries", body = ApiResponse<PaginatedResponse<AuditEntry>>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn product_history(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<AuditEntry>> {
    let page = pagination.resolve(&state.config);
    let history = state.services.audit.product_history(id, page).await?;
    Ok(Json(ApiResponse::success(history)))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<product::Model>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 409, description = "SKU already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state
        .services
        .products
        .create(payload, user.user_id)
        .await?;
    Ok(created_response(product, "Product created"))
}

/// Update descriptive fields. Quantity changes go through the stock endpoints.
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<product::Model>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "SKU already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult<product::Model> {
    let product = state.services.products.update(id, payload).await?;
    Ok(Json(ApiResponse::success(product).with_message("Product updated")))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted with its audit trail and notifications"),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<()> {
    state.services.products.delete(id).await?;
    Ok(Json(ApiResponse::message("Product deleted")))
}

/// Set the on-hand quantity to an absolute value
#[utoipa::path(
    post,
    path = "/api/products/{id}/stock",
    params(("id" = i32, Path, description = "Product id")),
    request_body = SetStockRequest,
    responses(
        (status = 200, description = "Stock updated", body = ApiResponse<StockAdjustment>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Stock"
)]
pub async fn set_stock(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    user: AuthUser,
    Json(payload): Json<SetStockRequest>,
) -> ApiResult<StockAdjustment> {
    let change = StockChange::set(id, user.user_id, payload)?;
    let adjustment = state.services.stock.adjust_stock(change).await?;
    Ok(Json(ApiResponse::success(adjustment).with_message("Stock updated")))
}

/// Apply a signed delta to the on-hand quantity
#[utoipa::path(
    post,
    path = "/api/products/{id}/stock/adjust",
    params(("id" = i32, Path, description = "Product id")),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<StockAdjustment>),
        (status = 400, description = "Invalid request or insufficient stock", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Stock"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    user: AuthUser,
    Json(payload): Json<AdjustStockRequest>,
) -> ApiResult<StockAdjustment> {
    let change = StockChange::adjust(id, user.user_id, payload)?;
    let adjustment = state.services.stock.adjust_stock(change).await?;
    Ok(Json(ApiResponse::success(adjustment).with_message("Stock adjusted")))
}
