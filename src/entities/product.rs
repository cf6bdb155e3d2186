use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{current, rule_violation};

/// Product entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "products")]
#[schema(as = Product)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Stock keeping unit, unique across the catalogue
    #[sea_orm(unique)]
    pub sku: String,

    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub category: Option<String>,

    /// Units currently on hand
    pub quantity: i32,

    /// At or below this quantity the product is considered low on stock
    pub reorder_level: i32,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,

    /// Free-form storage location (aisle, shelf, bin)
    pub location: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_audit::Entity")]
    InventoryAudits,
    #[sea_orm(has_many = "super::notification::Entity")]
    Notifications,
}

impl Related<super::inventory_audit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryAudits.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(now);

        if let Some(sku) = current(&active_model.sku) {
            if sku.trim().is_empty() {
                return Err(rule_violation("sku cannot be blank"));
            }
        }
        if current(&active_model.quantity).is_some_and(|q| *q < 0) {
            return Err(rule_violation("quantity cannot be negative"));
        }
        if current(&active_model.reorder_level).is_some_and(|r| *r < 0) {
            return Err(rule_violation("reorder_level cannot be negative"));
        }
        if current(&active_model.price).is_some_and(|p| p.is_sign_negative() && !p.is_zero()) {
            return Err(rule_violation("price cannot be negative"));
        }

        Ok(active_model)
    }
}
