use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::rule_violation;

/// Why a stock level changed
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationType {
    #[sea_orm(string_value = "initial_stock")]
    InitialStock,
    #[sea_orm(string_value = "manual_adjustment")]
    ManualAdjustment,
    #[sea_orm(string_value = "restock")]
    Restock,
    #[sea_orm(string_value = "sale")]
    Sale,
    #[sea_orm(string_value = "return")]
    Return,
    #[sea_orm(string_value = "damage")]
    Damage,
    #[sea_orm(string_value = "correction")]
    Correction,
    #[sea_orm(string_value = "bulk_import")]
    BulkImport,
}

/// Immutable record of a single stock change
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "inventory_audits")]
#[schema(as = InventoryAudit)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    /// User who performed the change
    pub user_id: i32,
    pub old_quantity: i32,
    pub new_quantity: i32,
    pub reason: String,
    pub operation_type: OperationType,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Signed change in units
    pub fn delta(&self) -> i32 {
        self.new_quantity - self.old_quantity
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    User,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            return Err(rule_violation("audit rows are immutable"));
        }

        let mut active_model = self;
        active_model.created_at = Set(Utc::now());
        Ok(active_model)
    }
}
