/*!
 * # Permissions Module
 *
 * Permission strings are `resource:action`. Routes are gated on these,
 * never on role names, so the role table in `rbac` is the only place that
 * decides who may do what.
 */

pub const PRODUCTS_READ: &str = "products:read";
pub const PRODUCTS_WRITE: &str = "products:write";

pub const STOCK_ADJUST: &str = "stock:adjust";

pub const NOTIFICATIONS_READ: &str = "notifications:read";
/// Marking notifications read
pub const NOTIFICATIONS_UPDATE: &str = "notifications:update";
/// Deleting notifications and running the reorder scan
pub const NOTIFICATIONS_MANAGE: &str = "notifications:manage";

pub const AUDIT_READ: &str = "audit:read";
pub const AUDIT_PURGE: &str = "audit:purge";

pub const REPORTS_READ: &str = "reports:read";

pub const BULK_IMPORT: &str = "bulk:import";
pub const BULK_EXPORT: &str = "bulk:export";

pub const USERS_MANAGE: &str = "users:manage";

/// Every permission known to the service
pub const ALL: &[&str] = &[
    PRODUCTS_READ,
    PRODUCTS_WRITE,
    STOCK_ADJUST,
    NOTIFICATIONS_READ,
    NOTIFICATIONS_UPDATE,
    NOTIFICATIONS_MANAGE,
    AUDIT_READ,
    AUDIT_PURGE,
    REPORTS_READ,
    BULK_IMPORT,
    BULK_EXPORT,
    USERS_MANAGE,
];
