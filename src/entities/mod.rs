pub mod inventory_audit;
pub mod notification;
pub mod product;
pub mod user;

use sea_orm::{ActiveValue, DbErr, Value};

use crate::errors::VALIDATION_PREFIX;

pub use inventory_audit::{Entity as InventoryAudit, OperationType};
pub use notification::{Entity as Notification, NotificationType};
pub use product::Entity as Product;
pub use user::{Entity as User, UserRole};

/// Current value of an active model field, whether freshly set or loaded.
pub(crate) fn current<V>(value: &ActiveValue<V>) -> Option<&V>
where
    V: Into<Value>,
{
    match value {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some(v),
        ActiveValue::NotSet => None,
    }
}

/// Build the error entity hooks return for a rule violation.
pub(crate) fn rule_violation(message: impl std::fmt::Display) -> DbErr {
    DbErr::Custom(format!("{VALIDATION_PREFIX}{message}"))
}
