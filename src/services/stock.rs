use crate::{
    db::{self, DbPool},
    entities::{inventory_audit, notification, product, OperationType},
    errors::ServiceError,
    services::notifications::NotificationService,
};
use metrics::counter;
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

pub const MIN_REASON_LENGTH: usize = 3;
pub const MAX_REASON_LENGTH: usize = 500;

/// Body of `POST /api/products/:id/stock`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetStockRequest {
    /// New on-hand quantity
    #[validate(range(min = 0, message = "quantity cannot be negative"))]
    pub quantity: i32,
    #[validate(custom = "validate_reason")]
    pub reason: String,
    /// Defaults to `manual_adjustment`
    pub operation_type: Option<OperationType>,
}

/// Body of `POST /api/products/:id/stock/adjust`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AdjustStockRequest {
    /// Signed change; negative removes stock
    #[validate(custom = "validate_delta")]
    pub delta: i32,
    #[validate(custom = "validate_reason")]
    pub reason: String,
    /// Defaults to `restock` for positive and `sale` for negative deltas
    pub operation_type: Option<OperationType>,
}

fn validate_reason(reason: &str) -> Result<(), validator::ValidationError> {
    let length = reason.trim().chars().count();
    if length < MIN_REASON_LENGTH {
        let mut err = validator::ValidationError::new("reason_too_short");
        err.message = Some(
            format!("reason must be at least {MIN_REASON_LENGTH} characters").into(),
        );
        return Err(err);
    }
    if length > MAX_REASON_LENGTH {
        let mut err = validator::ValidationError::new("reason_too_long");
        err.message = Some(format!("reason cannot exceed {MAX_REASON_LENGTH} characters").into());
        return Err(err);
    }
    Ok(())
}

fn validate_delta(delta: i32) -> Result<(), validator::ValidationError> {
    if delta == 0 {
        let mut err = validator::ValidationError::new("delta_zero");
        err.message = Some("delta cannot be zero".into());
        return Err(err);
    }
    Ok(())
}

/// How the new quantity is derived from the locked row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockTarget {
    /// Replace the quantity
    Set(i32),
    /// Add a signed amount to the quantity read under the lock
    Delta(i32),
}

impl StockTarget {
    fn resolve(self, current: &product::Model) -> Result<i32, ServiceError> {
        match self {
            StockTarget::Set(quantity) if quantity < 0 => Err(ServiceError::ValidationError(
                "quantity cannot be negative".to_string(),
            )),
            StockTarget::Set(quantity) => Ok(quantity),
            StockTarget::Delta(delta) => {
                let target = current.quantity.checked_add(delta).ok_or_else(|| {
                    ServiceError::ValidationError("quantity out of range".to_string())
                })?;
                if target < 0 {
                    return Err(ServiceError::InsufficientStock(format!(
                        "{} has {} units on hand; cannot remove {}",
                        current.sku,
                        current.quantity,
                        delta.unsigned_abs()
                    )));
                }
                Ok(target)
            }
        }
    }
}

/// A stock change requested by a user
#[derive(Debug, Clone)]
pub struct StockChange {
    pub product_id: i32,
    pub user_id: i32,
    pub target: StockTarget,
    pub reason: String,
    pub operation_type: OperationType,
}

impl StockChange {
    pub fn set(
        product_id: i32,
        user_id: i32,
        request: SetStockRequest,
    ) -> Result<Self, ServiceError> {
        request.validate()?;
        Ok(Self {
            product_id,
            user_id,
            target: StockTarget::Set(request.quantity),
            reason: request.reason,
            operation_type: request
                .operation_type
                .unwrap_or(OperationType::ManualAdjustment),
        })
    }

    pub fn adjust(
        product_id: i32,
        user_id: i32,
        request: AdjustStockRequest,
    ) -> Result<Self, ServiceError> {
        request.validate()?;
        let default_operation = if request.delta > 0 {
            OperationType::Restock
        } else {
            OperationType::Sale
        };
        Ok(Self {
            product_id,
            user_id,
            target: StockTarget::Delta(request.delta),
            reason: request.reason,
            operation_type: request.operation_type.unwrap_or(default_operation),
        })
    }
}

/// Result of a committed stock change
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockAdjustment {
    pub product: product::Model,
    pub audit: inventory_audit::Model,
    /// Notification raised by this change, if any
    pub notification: Option<notification::Model>,
}

/// Owns the stock adjustment transaction: the quantity update and its audit
/// row commit together, and notifications are evaluated after commit.
pub struct StockService {
    db: Arc<DbPool>,
    notifications: Arc<NotificationService>,
}

impl StockService {
    pub fn new(db: Arc<DbPool>, notifications: Arc<NotificationService>) -> Self {
        Self { db, notifications }
    }

    #[instrument(skip(self), fields(product_id = change.product_id, user_id = change.user_id))]
    pub async fn adjust_stock(&self, change: StockChange) -> Result<StockAdjustment, ServiceError> {
        let reason = change.reason.trim().to_string();
        let length = reason.chars().count();
        if !(MIN_REASON_LENGTH..=MAX_REASON_LENGTH).contains(&length) {
            return Err(ServiceError::ValidationError(format!(
                "reason must be between {MIN_REASON_LENGTH} and {MAX_REASON_LENGTH} characters"
            )));
        }

        let StockChange {
            product_id,
            user_id,
            target,
            operation_type,
            ..
        } = change;

        let (product, audit) = db::transaction(self.db.as_ref(), "stock.adjust", move |txn| {
            Box::pin(async move {
                let current = product::Entity::find_by_id(product_id)
                    .lock_exclusive()
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Product", product_id))?;

                let old_quantity = current.quantity;
                let new_quantity = target.resolve(&current)?;

                let mut active: product::ActiveModel = current.into();
                active.quantity = Set(new_quantity);
                let updated = active.update(txn).await?;

                let audit = inventory_audit::ActiveModel {
                    product_id: Set(product_id),
                    user_id: Set(user_id),
                    old_quantity: Set(old_quantity),
                    new_quantity: Set(new_quantity),
                    reason: Set(reason),
                    operation_type: Set(operation_type),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                Ok((updated, audit))
            })
        })
        .await?;

        counter!(
            "inventory_stock_adjustments_total",
            1,
            "operation" => operation_type.to_string()
        );
        info!(
            product_id,
            sku = %product.sku,
            old_quantity = audit.old_quantity,
            new_quantity = audit.new_quantity,
            operation = %operation_type,
            user_id,
            "Stock adjusted"
        );

        let notification = self.notifications.notify_stock_level(&product).await;

        Ok(StockAdjustment {
            product,
            audit,
            notification,
        })
    }
}
