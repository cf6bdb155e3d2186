pub mod audit;
pub mod auth;
pub mod bulk;
pub mod common;
pub mod health;
pub mod notifications;
pub mod products;
pub mod reports;

use crate::{
    auth::AuthService,
    config::AppConfig,
    db::DbPool,
    services::{
        audit::AuditService, bulk::BulkService, notifications::NotificationService,
        products::ProductService, reports::ReportService, stock::StockService,
        users::UserService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<ProductService>,
    pub stock: Arc<StockService>,
    pub notifications: Arc<NotificationService>,
    pub audit: Arc<AuditService>,
    pub reports: Arc<ReportService>,
    pub bulk: Arc<BulkService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, auth_service: Arc<AuthService>, config: &AppConfig) -> Self {
        let notifications = Arc::new(NotificationService::new(db_pool.clone()));
        let products = Arc::new(ProductService::new(db_pool.clone(), notifications.clone()));
        let stock = Arc::new(StockService::new(db_pool.clone(), notifications.clone()));
        let bulk = Arc::new(BulkService::new(
            db_pool.clone(),
            products.clone(),
            stock.clone(),
            config.max_import_rows,
        ));

        Self {
            products,
            stock,
            notifications,
            audit: Arc::new(AuditService::new(db_pool.clone())),
            reports: Arc::new(ReportService::new(db_pool.clone())),
            bulk,
            users: Arc::new(UserService::new(db_pool, auth_service)),
        }
    }
}
