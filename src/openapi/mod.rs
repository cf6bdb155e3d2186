use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventory API",
        version = "0.1.0",
        description = r#"
# Inventory Management API

Backend for small-business stock keeping.

## Features

- **Products**: Catalogue with SKU, category, price, location and reorder level
- **Stock adjustments**: Every quantity change is written together with an audit entry
- **Notifications**: Low-stock and out-of-stock alerts, deduplicated while unread
- **Audit trail**: Filterable history of every stock change
- **Reports**: Inventory value, category breakdown, stock movements and top movers
- **Bulk operations**: CSV import and export of the catalogue

## Authentication

All `/api` endpoints except `/api/auth/setup` and `/api/auth/login` require a JWT:

```
Authorization: Bearer <your-jwt-token>
```

Staff accounts can browse products, adjust stock, read notifications and the audit trail.
Managers can additionally edit the catalogue, manage accounts, read reports and import CSV files.

## Error Handling

Failures share one body format:

```json
{
  "success": false,
  "error": "Bad Request",
  "message": "Insufficient stock: ...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20, capped by configuration).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, logout and first-run setup"),
        (name = "Users", description = "Account administration"),
        (name = "Products", description = "Product catalogue"),
        (name = "Stock", description = "Audited stock adjustments"),
        (name = "Notifications", description = "Low-stock notifications"),
        (name = "Audit", description = "Stock change history"),
        (name = "Reports", description = "Inventory reports"),
        (name = "Bulk", description = "CSV import and export"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::health::health_check,

        // Auth
        crate::handlers::auth::setup,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,
        crate::handlers::auth::change_password,
        crate::handlers::auth::register,
        crate::handlers::auth::list_users,
        crate::handlers::auth::update_user,
        crate::handlers::auth::delete_user,

        // Products and stock
        crate::handlers::products::list_products,
        crate::handlers::products::list_categories,
        crate::handlers::products::low_stock_products,
        crate::handlers::products::get_product_by_sku,
        crate::handlers::products::get_product,
        crate::handlers::products::product_history,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::set_stock,
        crate::handlers::products::adjust_stock,

        // Notifications
        crate::handlers::notifications::list_notifications,
        crate::handlers::notifications::unread_count,
        crate::handlers::notifications::mark_all_read,
        crate::handlers::notifications::mark_read,
        crate::handlers::notifications::delete_notification,
        crate::handlers::notifications::reorder_scan,

        // Audit
        crate::handlers::audit::list_audit,
        crate::handlers::audit::get_audit,
        crate::handlers::audit::purge_audit,

        // Reports
        crate::handlers::reports::inventory_summary,
        crate::handlers::reports::low_stock_report,
        crate::handlers::reports::category_breakdown,
        crate::handlers::reports::stock_movements,
        crate::handlers::reports::top_movers,

        // Bulk
        crate::handlers::bulk::import_products,
        crate::handlers::bulk::export_products,
        crate::handlers::bulk::import_template,
    ),
    components(
        schemas(
            // Entities
            crate::entities::product::Model,
            crate::entities::inventory_audit::Model,
            crate::entities::notification::Model,
            crate::entities::OperationType,
            crate::entities::NotificationType,
            crate::entities::UserRole,

            // Requests
            crate::services::products::CreateProductRequest,
            crate::services::products::UpdateProductRequest,
            crate::services::products::ProductSortField,
            crate::services::SortOrder,
            crate::services::stock::SetStockRequest,
            crate::services::stock::AdjustStockRequest,
            crate::services::users::CreateUserRequest,
            crate::services::users::LoginRequest,
            crate::services::users::UpdateUserRequest,
            crate::services::users::ChangePasswordRequest,

            // Responses
            crate::auth::TokenResponse,
            crate::services::users::UserResponse,
            crate::services::users::LoginResponse,
            crate::services::stock::StockAdjustment,
            crate::services::audit::AuditEntry,
            crate::services::audit::PurgeSummary,
            crate::services::notifications::UnreadCount,
            crate::services::notifications::ReorderScanSummary,
            crate::handlers::notifications::MarkedRead,
            crate::services::reports::InventorySummary,
            crate::services::reports::LowStockItem,
            crate::services::reports::CategoryBreakdown,
            crate::services::reports::StockMovement,
            crate::services::reports::StockMovementReport,
            crate::services::reports::TopMover,
            crate::services::bulk::ImportSummary,
            crate::services::bulk::RowError,
            crate::handlers::health::HealthStatus,
            crate::ResponseMeta,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Registers the JWT bearer scheme referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_resource() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Inventory API"));
        for path in [
            "/api/products",
            "/api/products/{id}/stock/adjust",
            "/api/notifications/unread-count",
            "/api/audit/purge",
            "/api/reports/top-movers",
            "/api/bulk/import",
            "/api/auth/login",
        ] {
            assert!(json.contains(path), "missing {path}");
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let openapi = ApiDocV1::openapi();
        let components = openapi.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
