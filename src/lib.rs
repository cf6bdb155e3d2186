//! Inventory API Library
//!
//! Product catalogue, audited stock adjustments, low-stock notifications,
//! reports and CSV bulk operations for small businesses.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    response::Json,
    routing::{delete, get, post, put},
    Extension, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer};
use utoipa::ToSchema;

use crate::auth::permissions as perm;
use crate::auth::{AuthRouterExt, AuthService};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::PageRequest;

/// Multipart framing allowance on top of the configured upload size
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: AppConfig, auth: Arc<AuthService>) -> Self {
        let services = handlers::AppServices::new(db.clone(), auth.clone(), &config);
        Self {
            db,
            config: Arc::new(config),
            services,
            auth,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: PageRequest) -> Self {
        Self {
            items,
            total,
            page: page.page,
            limit: page.limit,
            total_pages: total.div_ceil(page.limit.max(1)),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    /// Success without a payload
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn message_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-msg"), async {
                ApiResponse::<()>::message("Logged out")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-msg"));
        assert!(!meta.timestamp.is_empty());
    }

    #[test]
    fn message_only_response_omits_data() {
        let value = serde_json::to_value(ApiResponse::<()>::message("Logged out")).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "Logged out");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = PageRequest { page: 2, limit: 20 };
        let response = PaginatedResponse::new(vec![1, 2, 3], 41, page);
        assert_eq!(response.total_pages, 3);
        assert_eq!(response.page, 2);

        let empty = PaginatedResponse::<i32>::new(vec![], 0, page);
        assert_eq!(empty.total_pages, 0);
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every `/api` route, each group gated on the permission it needs
pub fn api_routes() -> Router<AppState> {
    use handlers::{audit, auth, bulk, notifications, products, reports};

    let auth_public = Router::new()
        .route("/auth/setup", post(auth::setup))
        .route("/auth/login", post(auth::login));

    let auth_session = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/password", put(auth::change_password))
        .with_auth();

    let users_manage = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/users", get(auth::list_users))
        .route(
            "/auth/users/:id",
            put(auth::update_user).delete(auth::delete_user),
        )
        .with_permission(perm::USERS_MANAGE);

    let products_read = Router::new()
        .route("/products", get(products::list_products))
        .route("/products/categories", get(products::list_categories))
        .route("/products/low-stock", get(products::low_stock_products))
        .route("/products/sku/:sku", get(products::get_product_by_sku))
        .route("/products/:id", get(products::get_product))
        .route("/products/:id/history", get(products::product_history))
        .with_permission(perm::PRODUCTS_READ);

    let products_write = Router::new()
        .route("/products", post(products::create_product))
        .route(
            "/products/:id",
            put(products::update_product).delete(products::delete_product),
        )
        .with_permission(perm::PRODUCTS_WRITE);

    let stock_adjust = Router::new()
        .route("/products/:id/stock", post(products::set_stock))
        .route("/products/:id/stock/adjust", post(products::adjust_stock))
        .with_permission(perm::STOCK_ADJUST);

    let notifications_read = Router::new()
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .with_permission(perm::NOTIFICATIONS_READ);

    let notifications_update = Router::new()
        .route("/notifications/read-all", put(notifications::mark_all_read))
        .route("/notifications/:id/read", put(notifications::mark_read))
        .with_permission(perm::NOTIFICATIONS_UPDATE);

    let notifications_manage = Router::new()
        .route("/notifications/:id", delete(notifications::delete_notification))
        .route(
            "/notifications/reorder-scan",
            post(notifications::reorder_scan),
        )
        .with_permission(perm::NOTIFICATIONS_MANAGE);

    let audit_read = Router::new()
        .route("/audit", get(audit::list_audit))
        .route("/audit/:id", get(audit::get_audit))
        .with_permission(perm::AUDIT_READ);

    let audit_purge = Router::new()
        .route("/audit/purge", delete(audit::purge_audit))
        .with_permission(perm::AUDIT_PURGE);

    let reports_read = Router::new()
        .route(
            "/reports/inventory-summary",
            get(reports::inventory_summary),
        )
        .route("/reports/low-stock", get(reports::low_stock_report))
        .route(
            "/reports/category-breakdown",
            get(reports::category_breakdown),
        )
        .route("/reports/stock-movements", get(reports::stock_movements))
        .route("/reports/top-movers", get(reports::top_movers))
        .with_permission(perm::REPORTS_READ);

    let bulk_import = Router::new()
        .route("/bulk/import", post(bulk::import_products))
        .with_permission(perm::BULK_IMPORT);

    let bulk_export = Router::new()
        .route("/bulk/export", get(bulk::export_products))
        .route("/bulk/template", get(bulk::import_template))
        .with_permission(perm::BULK_EXPORT);

    Router::new()
        // Auth and accounts
        .merge(auth_public)
        .merge(auth_session)
        .merge(users_manage)
        // Catalogue and stock
        .merge(products_read)
        .merge(products_write)
        .merge(stock_adjust)
        // Notifications
        .merge(notifications_read)
        .merge(notifications_update)
        .merge(notifications_manage)
        // Audit trail
        .merge(audit_read)
        .merge(audit_purge)
        // Reports and bulk
        .merge(reports_read)
        .merge(bulk_import)
        .merge(bulk_export)
}

/// CORS from configuration; permissive only in development without explicit origins
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        if config.is_development() {
            ::tracing::info!("Using permissive CORS because no origins are configured");
            return CorsLayer::permissive();
        }
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(middleware_helpers::REQUEST_ID_HEADER),
        ])
        .allow_credentials(config.cors_allow_credentials)
}

/// The complete application: health, API, Swagger UI and the middleware stack
pub fn app_router(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .layer(DefaultBodyLimit::max(
            config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES,
        ))
        // AuthService for auth_middleware
        .layer(Extension(state.auth.clone()))
        .layer(axum::middleware::from_fn(
            middleware_helpers::security_headers_middleware,
        ))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config))
        .layer(crate::tracing::configure_http_tracing())
        // Outermost so every layer below sees the request id
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
