/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Maps the two account roles to the permissions they grant.
 */

use lazy_static::lazy_static;
use std::collections::HashMap;

use super::permissions as perm;
use crate::entities::UserRole;

/// Role definition with associated permissions
#[derive(Debug, Clone)]
pub struct Role {
    pub name: &'static str,
    pub description: &'static str,
    pub permissions: Vec<&'static str>,
}

const STAFF_PERMISSIONS: &[&str] = &[
    perm::PRODUCTS_READ,
    perm::STOCK_ADJUST,
    perm::NOTIFICATIONS_READ,
    perm::NOTIFICATIONS_UPDATE,
    perm::AUDIT_READ,
    perm::BULK_EXPORT,
];

lazy_static! {
    pub static ref ROLES: HashMap<UserRole, Role> = {
        let mut roles = HashMap::new();

        roles.insert(
            UserRole::Staff,
            Role {
                name: "staff",
                description: "Floor staff: browse products and record stock movements",
                permissions: STAFF_PERMISSIONS.to_vec(),
            },
        );

        // Managers hold every permission, including the staff set.
        roles.insert(
            UserRole::Manager,
            Role {
                name: "manager",
                description: "Manager with catalogue, reporting and account administration",
                permissions: perm::ALL.to_vec(),
            },
        );

        roles
    };
}

/// Permissions granted to `role`
pub fn permissions_for(role: UserRole) -> Vec<String> {
    ROLES
        .get(&role)
        .map(|r| r.permissions.iter().map(|p| p.to_string()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_permissions_are_a_superset_of_staff() {
        let staff = permissions_for(UserRole::Staff);
        let manager = permissions_for(UserRole::Manager);
        assert!(staff.iter().all(|p| manager.contains(p)));
        assert!(manager.len() > staff.len());
    }

    #[test]
    fn staff_cannot_write_products_or_read_reports() {
        let staff = permissions_for(UserRole::Staff);
        for restricted in [
            perm::PRODUCTS_WRITE,
            perm::REPORTS_READ,
            perm::BULK_IMPORT,
            perm::AUDIT_PURGE,
            perm::USERS_MANAGE,
            perm::NOTIFICATIONS_MANAGE,
        ] {
            assert!(!staff.iter().any(|p| p == restricted), "{restricted}");
        }
    }
}
