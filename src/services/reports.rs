use crate::{
    db::DbPool,
    entities::{inventory_audit, notification, product, OperationType},
    errors::ServiceError,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    sea_query::{Alias, Expr, Func, SimpleExpr},
    ColumnTrait, EntityTrait, FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

pub const MAX_REPORT_DAYS: i64 = 365;
pub const MAX_TOP_MOVERS: u64 = 100;

/// Overall stock position
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventorySummary {
    pub total_products: u64,
    pub total_units: i64,
    /// Sum of quantity × price
    pub total_value: f64,
    pub low_stock_count: u64,
    pub out_of_stock_count: u64,
    pub category_count: u64,
    pub unread_notifications: u64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LowStockItem {
    pub product_id: i32,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub quantity: i32,
    pub reorder_level: i32,
    /// Units needed to get back to the reorder level
    pub shortfall: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryBreakdown {
    pub category: String,
    pub product_count: i64,
    pub total_units: i64,
    pub total_value: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockMovement {
    pub operation_type: OperationType,
    pub adjustments: i64,
    pub units_in: i64,
    pub units_out: i64,
    pub net_change: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockMovementReport {
    pub days: i64,
    pub since: DateTime<Utc>,
    pub movements: Vec<StockMovement>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopMover {
    pub product_id: i32,
    pub sku: String,
    pub name: String,
    pub adjustments: i64,
    pub units_moved: i64,
}

#[derive(Debug, FromQueryResult)]
struct StockTotals {
    total_units: Option<i64>,
    total_value: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
struct CategoryRow {
    category: Option<String>,
    product_count: i64,
    total_units: Option<i64>,
    total_value: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
struct MovementRow {
    operation_type: OperationType,
    adjustments: i64,
    units_in: Option<i64>,
    units_out: Option<i64>,
}

#[derive(Debug, FromQueryResult)]
struct MoverRow {
    product_id: i32,
    sku: String,
    name: String,
    adjustments: i64,
    units_moved: Option<i64>,
}

fn stock_value() -> SimpleExpr {
    SimpleExpr::FunctionCall(Func::sum(Func::cast_as(
        Expr::col(product::Column::Quantity).mul(Expr::col(product::Column::Price)),
        Alias::new("float8"),
    )))
}

fn sum(expr: impl Into<SimpleExpr>) -> SimpleExpr {
    SimpleExpr::FunctionCall(Func::sum(expr))
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn validate_days(days: i64) -> Result<DateTime<Utc>, ServiceError> {
    if !(1..=MAX_REPORT_DAYS).contains(&days) {
        return Err(ServiceError::ValidationError(format!(
            "days must be between 1 and {MAX_REPORT_DAYS}"
        )));
    }
    Ok(Utc::now() - Duration::days(days))
}

/// Read-only aggregate reports computed in SQL
pub struct ReportService {
    db: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn inventory_summary(&self) -> Result<InventorySummary, ServiceError> {
        let db = self.db.as_ref();

        let total_products = product::Entity::find().count(db).await?;
        let out_of_stock_count = product::Entity::find()
            .filter(product::Column::Quantity.eq(0))
            .count(db)
            .await?;
        let low_stock_count = product::Entity::find()
            .filter(product::Column::Quantity.gt(0))
            .filter(
                Expr::col(product::Column::Quantity).lte(Expr::col(product::Column::ReorderLevel)),
            )
            .count(db)
            .await?;
        let category_count = product::Entity::find()
            .select_only()
            .column(product::Column::Category)
            .distinct()
            .filter(product::Column::Category.is_not_null())
            .count(db)
            .await?;
        let unread_notifications = notification::Entity::find()
            .filter(notification::Column::IsRead.eq(false))
            .count(db)
            .await?;

        let totals = product::Entity::find()
            .select_only()
            .column_as(product::Column::Quantity.sum(), "total_units")
            .column_as(stock_value(), "total_value")
            .into_model::<StockTotals>()
            .one(db)
            .await?;
        let (total_units, total_value) = totals
            .map(|t| (t.total_units.unwrap_or(0), t.total_value.unwrap_or(0.0)))
            .unwrap_or((0, 0.0));

        Ok(InventorySummary {
            total_products,
            total_units,
            total_value: round_cents(total_value),
            low_stock_count,
            out_of_stock_count,
            category_count,
            unread_notifications,
            generated_at: Utc::now(),
        })
    }

    /// Products at or below their reorder level, lowest quantity first
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<LowStockItem>, ServiceError> {
        let products = product::Entity::find()
            .filter(
                Expr::col(product::Column::Quantity).lte(Expr::col(product::Column::ReorderLevel)),
            )
            .order_by_asc(product::Column::Quantity)
            .order_by_asc(product::Column::Sku)
            .all(self.db.as_ref())
            .await?;

        Ok(products
            .into_iter()
            .map(|p| LowStockItem {
                shortfall: p.reorder_level - p.quantity,
                product_id: p.id,
                sku: p.sku,
                name: p.name,
                category: p.category,
                quantity: p.quantity,
                reorder_level: p.reorder_level,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn category_breakdown(&self) -> Result<Vec<CategoryBreakdown>, ServiceError> {
        let rows = product::Entity::find()
            .select_only()
            .column(product::Column::Category)
            .column_as(product::Column::Id.count(), "product_count")
            .column_as(product::Column::Quantity.sum(), "total_units")
            .column_as(stock_value(), "total_value")
            .group_by(product::Column::Category)
            .order_by_asc(product::Column::Category)
            .into_model::<CategoryRow>()
            .all(self.db.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| CategoryBreakdown {
                category: row.category.unwrap_or_else(|| "Uncategorized".to_string()),
                product_count: row.product_count,
                total_units: row.total_units.unwrap_or(0),
                total_value: round_cents(row.total_value.unwrap_or(0.0)),
            })
            .collect())
    }

    /// Units in and out per operation type over the last `days` days
    #[instrument(skip(self))]
    pub async fn stock_movements(&self, days: i64) -> Result<StockMovementReport, ServiceError> {
        let since = validate_days(days)?;

        let new_qty = || Expr::col(inventory_audit::Column::NewQuantity);
        let old_qty = || Expr::col(inventory_audit::Column::OldQuantity);
        let units_in = Expr::case(new_qty().gt(old_qty()), new_qty().sub(old_qty())).finally(0);
        let units_out = Expr::case(old_qty().gt(new_qty()), old_qty().sub(new_qty())).finally(0);

        let rows = inventory_audit::Entity::find()
            .select_only()
            .column(inventory_audit::Column::OperationType)
            .column_as(inventory_audit::Column::Id.count(), "adjustments")
            .column_as(sum(units_in), "units_in")
            .column_as(sum(units_out), "units_out")
            .filter(inventory_audit::Column::CreatedAt.gte(since))
            .group_by(inventory_audit::Column::OperationType)
            .order_by_asc(inventory_audit::Column::OperationType)
            .into_model::<MovementRow>()
            .all(self.db.as_ref())
            .await?;

        let movements = rows
            .into_iter()
            .map(|row| {
                let units_in = row.units_in.unwrap_or(0);
                let units_out = row.units_out.unwrap_or(0);
                StockMovement {
                    operation_type: row.operation_type,
                    adjustments: row.adjustments,
                    units_in,
                    units_out,
                    net_change: units_in - units_out,
                }
            })
            .collect();

        Ok(StockMovementReport {
            days,
            since,
            movements,
        })
    }

    /// Products with the most stock changes over the last `days` days
    #[instrument(skip(self))]
    pub async fn top_movers(&self, days: i64, limit: u64) -> Result<Vec<TopMover>, ServiceError> {
        let since = validate_days(days)?;
        if !(1..=MAX_TOP_MOVERS).contains(&limit) {
            return Err(ServiceError::ValidationError(format!(
                "limit must be between 1 and {MAX_TOP_MOVERS}"
            )));
        }

        let new_qty = || Expr::col(inventory_audit::Column::NewQuantity);
        let old_qty = || Expr::col(inventory_audit::Column::OldQuantity);
        let moved = Expr::case(new_qty().gte(old_qty()), new_qty().sub(old_qty()))
            .finally(old_qty().sub(new_qty()));

        let rows = inventory_audit::Entity::find()
            .select_only()
            .column(inventory_audit::Column::ProductId)
            .column(product::Column::Sku)
            .column(product::Column::Name)
            .column_as(inventory_audit::Column::Id.count(), "adjustments")
            .column_as(sum(moved), "units_moved")
            .join(JoinType::InnerJoin, inventory_audit::Relation::Product.def())
            .filter(inventory_audit::Column::CreatedAt.gte(since))
            .group_by(inventory_audit::Column::ProductId)
            .group_by(product::Column::Sku)
            .group_by(product::Column::Name)
            .order_by_desc(SimpleExpr::from(Expr::col(Alias::new("adjustments"))))
            .order_by_asc(product::Column::Sku)
            .limit(limit)
            .into_model::<MoverRow>()
            .all(self.db.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| TopMover {
                product_id: row.product_id,
                sku: row.sku,
                name: row.name,
                adjustments: row.adjustments,
                units_moved: row.units_moved.unwrap_or(0),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(30, true)]
    #[case(365, true)]
    #[case(366, false)]
    fn report_window_is_bounded(#[case] days: i64, #[case] ok: bool) {
        assert_eq!(validate_days(days).is_ok(), ok);
    }

    #[test]
    fn values_round_to_cents() {
        assert_eq!(round_cents(10.004), 10.0);
        assert_eq!(round_cents(10.006), 10.01);
    }
}
