//! Seed data script - populates the database with demo inventory
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - a manager and a staff account (when no accounts exist yet)
//! - 12 products across four categories, some already below their reorder level
//! - a handful of sales and restocks so reports have something to show

use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

use inventory_api::{
    auth::{AuthConfig, AuthService},
    config, db,
    entities::{OperationType, UserRole},
    errors::ServiceError,
    handlers::AppServices,
    services::{
        products::CreateProductRequest,
        stock::{AdjustStockRequest, StockChange},
        users::CreateUserRequest,
    },
};

struct SeedProduct {
    sku: &'static str,
    name: &'static str,
    category: &'static str,
    quantity: i32,
    reorder_level: i32,
    price: Decimal,
    location: &'static str,
}

const fn seed(
    sku: &'static str,
    name: &'static str,
    category: &'static str,
    quantity: i32,
    reorder_level: i32,
    price: Decimal,
    location: &'static str,
) -> SeedProduct {
    SeedProduct {
        sku,
        name,
        category,
        quantity,
        reorder_level,
        price,
        location,
    }
}

fn catalogue() -> Vec<SeedProduct> {
    vec![
        seed("BOLT-M6-40", "Hex bolt M6x40", "Fasteners", 850, 200, dec!(0.18), "A1-01"),
        seed("NUT-M6", "Hex nut M6", "Fasteners", 1200, 300, dec!(0.05), "A1-02"),
        seed("WSHR-M6", "Flat washer M6", "Fasteners", 90, 250, dec!(0.03), "A1-03"),
        seed("SCRW-WD-35", "Wood screw 3.5x30", "Fasteners", 0, 150, dec!(0.07), "A1-04"),
        seed("DRL-HSS-6", "HSS drill bit 6mm", "Tools", 42, 10, dec!(4.90), "B2-01"),
        seed("HMR-CLAW-16", "Claw hammer 16oz", "Tools", 7, 8, dec!(18.50), "B2-02"),
        seed("TAPE-5M", "Measuring tape 5m", "Tools", 25, 6, dec!(9.99), "B2-03"),
        seed("GLV-NIT-L", "Nitrile gloves L (100)", "Safety", 14, 20, dec!(12.40), "C3-01"),
        seed("GGL-CLR", "Safety goggles clear", "Safety", 33, 10, dec!(6.75), "C3-02"),
        seed("PNT-WHT-1L", "Interior paint white 1L", "Paint", 60, 12, dec!(14.20), "D4-01"),
        seed("BRSH-50", "Paint brush 50mm", "Paint", 3, 10, dec!(3.60), "D4-02"),
        seed("RLR-230", "Paint roller 230mm", "Paint", 18, 5, dec!(7.80), "D4-03"),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::load_config().context("failed to load application config")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!("=== Inventory Seed Data ===");

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;
    db::run_migrations(&pool).await?;
    let pool = Arc::new(pool);

    let auth = Arc::new(AuthService::new(AuthConfig::from(&cfg)));
    let services = AppServices::new(pool.clone(), auth, &cfg);

    let manager_id = match services
        .users
        .setup_first_manager(CreateUserRequest {
            username: "manager".into(),
            email: "manager@example.com".into(),
            password: "manager-pass-123".into(),
            role: None,
        })
        .await
    {
        Ok(manager) => {
            services
                .users
                .create_user(CreateUserRequest {
                    username: "staff".into(),
                    email: "staff@example.com".into(),
                    password: "staff-pass-123".into(),
                    role: Some(UserRole::Staff),
                })
                .await?;
            info!("Created accounts manager/manager-pass-123 and staff/staff-pass-123");
            manager.id
        }
        Err(ServiceError::Conflict(_)) => {
            warn!("Accounts already exist; seeding products only");
            let users = services.users.list().await?;
            users
                .iter()
                .find(|u| u.role == UserRole::Manager)
                .or(users.first())
                .map(|u| u.id)
                .context("no account available to attribute seed data to")?
        }
        Err(e) => return Err(e.into()),
    };

    info!("Creating products...");
    let mut created = Vec::new();
    for item in catalogue() {
        let request = CreateProductRequest {
            sku: item.sku.into(),
            name: item.name.into(),
            description: None,
            category: Some(item.category.into()),
            quantity: Some(item.quantity),
            reorder_level: Some(item.reorder_level),
            price: item.price,
            location: Some(item.location.into()),
        };
        match services.products.create(request, manager_id).await {
            Ok(product) => created.push(product),
            Err(ServiceError::Conflict(_)) => info!(sku = item.sku, "Product exists, skipping"),
            Err(e) => return Err(e.into()),
        }
    }
    info!("  Created {} products", created.len());

    info!("Recording stock movements...");
    let mut movements = 0;
    for product in created.iter().filter(|p| p.quantity >= 10) {
        let sale = AdjustStockRequest {
            delta: -(product.quantity / 10),
            reason: "Counter sale".into(),
            operation_type: Some(OperationType::Sale),
        };
        services
            .stock
            .adjust_stock(StockChange::adjust(product.id, manager_id, sale)?)
            .await?;

        let restock = AdjustStockRequest {
            delta: product.reorder_level,
            reason: "Supplier delivery".into(),
            operation_type: Some(OperationType::Restock),
        };
        services
            .stock
            .adjust_stock(StockChange::adjust(product.id, manager_id, restock)?)
            .await?;
        movements += 2;
    }
    info!("  Recorded {} stock movements", movements);

    info!("=== Seed Data Complete ===");
    info!("Try: curl -H 'Authorization: Bearer <token>' http://localhost:8080/api/products");
    info!("Or explore interactively at: http://localhost:8080/swagger-ui");

    drop(services);
    if let Ok(pool) = Arc::try_unwrap(pool) {
        db::close_pool(pool).await?;
    }
    Ok(())
}
