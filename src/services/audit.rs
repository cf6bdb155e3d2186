use crate::{
    db::DbPool,
    entities::{inventory_audit, product, user, OperationType},
    errors::ServiceError,
    services::PageRequest,
    PaginatedResponse,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::{ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

/// Longest retention window a purge accepts, roughly a century
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Filters for `GET /api/audit`. Dates are inclusive calendar days in UTC.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditFilter {
    pub product_id: Option<i32>,
    pub user_id: Option<i32>,
    pub operation_type: Option<OperationType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl AuditFilter {
    fn condition(&self) -> Result<Condition, ServiceError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ServiceError::ValidationError(
                    "from must not be after to".to_string(),
                ));
            }
        }

        let mut condition = Condition::all();
        if let Some(product_id) = self.product_id {
            condition = condition.add(inventory_audit::Column::ProductId.eq(product_id));
        }
        if let Some(user_id) = self.user_id {
            condition = condition.add(inventory_audit::Column::UserId.eq(user_id));
        }
        if let Some(operation) = self.operation_type {
            condition = condition.add(inventory_audit::Column::OperationType.eq(operation));
        }
        if let Some(from) = self.from {
            condition = condition.add(inventory_audit::Column::CreatedAt.gte(start_of_day(from)));
        }
        if let Some(to) = self.to {
            let next_day = start_of_day(to)
                .checked_add_signed(Duration::days(1))
                .ok_or_else(|| ServiceError::ValidationError("to is out of range".to_string()))?;
            condition = condition.add(inventory_audit::Column::CreatedAt.lt(next_day));
        }
        Ok(condition)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::default()).and_utc()
}

/// Audit row joined with the product and user it refers to
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditEntry {
    #[serde(flatten)]
    pub audit: inventory_audit::Model,
    pub delta: i32,
    pub product_sku: Option<String>,
    pub product_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurgeSummary {
    pub deleted: u64,
    /// Rows created before this instant were removed
    pub cutoff: DateTime<Utc>,
}

pub struct AuditService {
    db: Arc<DbPool>,
}

impl AuditService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: AuditFilter,
        page: PageRequest,
    ) -> Result<PaginatedResponse<AuditEntry>, ServiceError> {
        let condition = filter.condition()?;
        let db = self.db.as_ref();

        let paginator = inventory_audit::Entity::find()
            .filter(condition)
            .find_also_related(product::Entity)
            .order_by_desc(inventory_audit::Column::CreatedAt)
            .order_by_desc(inventory_audit::Column::Id)
            .paginate(db, page.limit);

        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.page - 1).await?;
        let items = self.attach_usernames(rows).await?;
        Ok(PaginatedResponse::new(items, total, page))
    }

    pub async fn get(&self, id: i32) -> Result<AuditEntry, ServiceError> {
        let row = inventory_audit::Entity::find_by_id(id)
            .find_also_related(product::Entity)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("Audit entry", id))?;

        self.attach_usernames(vec![row])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found("Audit entry", id))
    }

    /// Stock history of one product, newest first
    pub async fn product_history(
        &self,
        product_id: i32,
        page: PageRequest,
    ) -> Result<PaginatedResponse<AuditEntry>, ServiceError> {
        let exists = product::Entity::find_by_id(product_id)
            .count(self.db.as_ref())
            .await?;
        if exists == 0 {
            return Err(ServiceError::not_found("Product", product_id));
        }

        let filter = AuditFilter {
            product_id: Some(product_id),
            ..Default::default()
        };
        self.list(filter, page).await
    }

    /// Deletes audit rows older than `older_than_days` days.
    #[instrument(skip(self))]
    pub async fn purge(&self, older_than_days: i64) -> Result<PurgeSummary, ServiceError> {
        if !(1..=MAX_RETENTION_DAYS).contains(&older_than_days) {
            return Err(ServiceError::ValidationError(format!(
                "older_than_days must be between 1 and {MAX_RETENTION_DAYS}"
            )));
        }

        let cutoff = Duration::try_days(older_than_days)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .ok_or_else(|| {
                ServiceError::ValidationError("older_than_days is out of range".to_string())
            })?;
        let result = inventory_audit::Entity::delete_many()
            .filter(inventory_audit::Column::CreatedAt.lt(cutoff))
            .exec(self.db.as_ref())
            .await?;

        info!(
            deleted = result.rows_affected,
            %cutoff,
            "Purged audit entries"
        );

        Ok(PurgeSummary {
            deleted: result.rows_affected,
            cutoff,
        })
    }

    async fn attach_usernames(
        &self,
        rows: Vec<(inventory_audit::Model, Option<product::Model>)>,
    ) -> Result<Vec<AuditEntry>, ServiceError> {
        let mut user_ids: Vec<i32> = rows.iter().map(|(audit, _)| audit.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        let usernames: HashMap<i32, String> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            user::Entity::find()
                .filter(user::Column::Id.is_in(user_ids))
                .all(self.db.as_ref())
                .await?
                .into_iter()
                .map(|u| (u.id, u.username))
                .collect()
        };

        Ok(rows
            .into_iter()
            .map(|(audit, product)| AuditEntry {
                delta: audit.delta(),
                username: usernames.get(&audit.user_id).cloned(),
                product_sku: product.as_ref().map(|p| p.sku.clone()),
                product_name: product.map(|p| p.name),
                audit,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_date_range_is_rejected() {
        let filter = AuditFilter {
            from: NaiveDate::from_ymd_opt(2024, 3, 10),
            to: NaiveDate::from_ymd_opt(2024, 3, 1),
            ..Default::default()
        };
        assert!(matches!(
            filter.condition(),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn day_boundaries_are_utc_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(start_of_day(date).to_rfc3339(), "2024-03-10T00:00:00+00:00");
    }

    #[test]
    fn last_representable_day_is_rejected_not_overflowed() {
        let filter = AuditFilter {
            to: Some(NaiveDate::MAX),
            ..Default::default()
        };
        assert!(matches!(
            filter.condition(),
            Err(ServiceError::ValidationError(_))
        ));
    }
}
