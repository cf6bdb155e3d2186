use crate::{
    db::DbPool,
    entities::{
        notification::{self, NotificationType},
        product,
    },
    errors::ServiceError,
    services::PageRequest,
    PaginatedResponse,
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};

/// Filters for listing notifications
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationFilter {
    pub is_read: Option<bool>,
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
    pub product_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UnreadCount {
    pub unread: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReorderScanSummary {
    /// Products at or below their reorder level
    pub products_below_reorder_level: usize,
    /// Notifications written by this scan
    pub notifications_created: usize,
}

/// Which notification, if any, a stock level calls for.
pub fn classify(quantity: i32, reorder_level: i32) -> Option<NotificationType> {
    if quantity <= 0 {
        Some(NotificationType::OutOfStock)
    } else if quantity <= reorder_level {
        Some(NotificationType::LowStock)
    } else {
        None
    }
}

fn message_for(product: &product::Model, kind: NotificationType) -> String {
    match kind {
        NotificationType::OutOfStock => {
            format!("{} ({}) is out of stock", product.name, product.sku)
        }
        NotificationType::LowStock => format!(
            "{} ({}) is low on stock: {} left, reorder level {}",
            product.name, product.sku, product.quantity, product.reorder_level
        ),
        NotificationType::ReorderRequired => format!(
            "Reorder {} ({}): {} on hand, reorder level {}",
            product.name, product.sku, product.quantity, product.reorder_level
        ),
    }
}

pub struct NotificationService {
    db: Arc<DbPool>,
}

impl NotificationService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Writes a stock-level notification for `product` unless an unread one
    /// of the same type already exists.
    #[instrument(skip(self, product), fields(product_id = product.id))]
    pub async fn evaluate_stock_level(
        &self,
        product: &product::Model,
    ) -> Result<Option<notification::Model>, ServiceError> {
        match classify(product.quantity, product.reorder_level) {
            Some(kind) => self.create_if_absent(product, kind).await,
            None => Ok(None),
        }
    }

    /// Same as [`evaluate_stock_level`](Self::evaluate_stock_level) but never
    /// fails: errors are logged and swallowed.
    pub async fn notify_stock_level(&self, product: &product::Model) -> Option<notification::Model> {
        match self.evaluate_stock_level(product).await {
            Ok(created) => created,
            Err(e) => {
                warn!(
                    product_id = product.id,
                    sku = %product.sku,
                    error = %e,
                    "Failed to record stock notification"
                );
                None
            }
        }
    }

    async fn create_if_absent(
        &self,
        product: &product::Model,
        kind: NotificationType,
    ) -> Result<Option<notification::Model>, ServiceError> {
        let db = self.db.as_ref();

        let existing = notification::Entity::find()
            .filter(notification::Column::ProductId.eq(product.id))
            .filter(notification::Column::NotificationType.eq(kind))
            .filter(notification::Column::IsRead.eq(false))
            .one(db)
            .await?;

        if let Some(existing) = existing {
            debug!(
                notification_id = existing.id,
                kind = %kind,
                "Unread notification already present"
            );
            return Ok(None);
        }

        let created = notification::ActiveModel {
            product_id: Set(product.id),
            message: Set(message_for(product, kind)),
            notification_type: Set(kind),
            is_read: Set(false),
            ..Default::default()
        }
        .insert(db)
        .await?;

        counter!("inventory_notifications_created_total", 1, "type" => kind.to_string());
        info!(
            notification_id = created.id,
            product_id = product.id,
            kind = %kind,
            "Notification created"
        );

        Ok(Some(created))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: NotificationFilter,
        page: PageRequest,
    ) -> Result<PaginatedResponse<notification::Model>, ServiceError> {
        let mut condition = Condition::all();
        if let Some(is_read) = filter.is_read {
            condition = condition.add(notification::Column::IsRead.eq(is_read));
        }
        if let Some(kind) = filter.notification_type {
            condition = condition.add(notification::Column::NotificationType.eq(kind));
        }
        if let Some(product_id) = filter.product_id {
            condition = condition.add(notification::Column::ProductId.eq(product_id));
        }

        let paginator = notification::Entity::find()
            .filter(condition)
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .paginate(self.db.as_ref(), page.limit);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.page - 1).await?;
        Ok(PaginatedResponse::new(items, total, page))
    }

    pub async fn unread_count(&self) -> Result<UnreadCount, ServiceError> {
        let unread = notification::Entity::find()
            .filter(notification::Column::IsRead.eq(false))
            .count(self.db.as_ref())
            .await?;
        Ok(UnreadCount { unread })
    }

    pub async fn mark_read(&self, id: i32) -> Result<notification::Model, ServiceError> {
        let db = self.db.as_ref();
        let existing = notification::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Notification", id))?;

        if existing.is_read {
            return Ok(existing);
        }

        let mut active: notification::ActiveModel = existing.into();
        active.is_read = Set(true);
        Ok(active.update(db).await?)
    }

    /// Marks every unread notification read; returns how many changed
    pub async fn mark_all_read(&self) -> Result<u64, ServiceError> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .col_expr(notification::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.db.as_ref())
            .await?;
        info!(updated = result.rows_affected, "Marked all notifications read");
        Ok(result.rows_affected)
    }

    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = notification::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Notification", id));
        }
        Ok(())
    }

    /// Writes a `reorder_required` notification for every product at or
    /// below its reorder level that does not already have an unread one.
    #[instrument(skip(self))]
    pub async fn reorder_scan(&self) -> Result<ReorderScanSummary, ServiceError> {
        let products = product::Entity::find()
            .filter(
                Expr::col(product::Column::Quantity).lte(Expr::col(product::Column::ReorderLevel)),
            )
            .order_by_asc(product::Column::Id)
            .all(self.db.as_ref())
            .await?;

        let mut created = 0;
        for product in &products {
            if self
                .create_if_absent(product, NotificationType::ReorderRequired)
                .await?
                .is_some()
            {
                created += 1;
            }
        }

        info!(
            scanned = products.len(),
            created, "Reorder scan complete"
        );

        Ok(ReorderScanSummary {
            products_below_reorder_level: products.len(),
            notifications_created: created,
        })
    }
}
