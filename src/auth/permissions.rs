/*!
 * # Permissions Module
 *
 * Permission strings for the ledger surface, organized by resource and
 * action, plus the default role grants.
 */

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Permission definition
#[derive(Debug, Clone)]
pub struct Permission {
    pub name: String,
    pub description: String,
    pub resource_type: String,
    pub action: String,
}

/// Permission actions
pub struct Actions;

impl Actions {
    pub const READ: &'static str = "read";
    pub const WRITE: &'static str = "write";
    pub const DELETE: &'static str = "delete";
}

/// Resource types
pub struct Resources;

impl Resources {
    pub const INVENTORY: &'static str = "inventory";
    pub const SALES: &'static str = "sales";
    pub const SHIPMENTS: &'static str = "shipments";
    pub const SNAPSHOTS: &'static str = "snapshots";
}

/// Common permission string constants for compile-time safety
pub mod consts {
    pub const INVENTORY_READ: &str = "inventory:read";
    pub const INVENTORY_WRITE: &str = "inventory:write";

    pub const SALES_READ: &str = "sales:read";
    pub const SALES_WRITE: &str = "sales:write";
    pub const SALES_DELETE: &str = "sales:delete";

    pub const SHIPMENTS_READ: &str = "shipments:read";
    pub const SHIPMENTS_WRITE: &str = "shipments:write";

    pub const SNAPSHOTS_READ: &str = "snapshots:read";
    pub const SNAPSHOTS_WRITE: &str = "snapshots:write";
    pub const SNAPSHOTS_DELETE: &str = "snapshots:delete";
}

/// Format a permission string
pub fn format_permission(resource: &str, action: &str) -> String {
    format!("{}:{}", resource, action)
}

lazy_static! {
    pub static ref PERMISSIONS: HashMap<String, Permission> = {
        let mut perms = HashMap::new();

        let mut insert = |resource: &str, action: &str, description: &str| {
            let name = format_permission(resource, action);
            perms.insert(
                name.clone(),
                Permission {
                    name,
                    description: description.to_string(),
                    resource_type: resource.to_string(),
                    action: action.to_string(),
                },
            );
        };

        insert(
            Resources::INVENTORY,
            Actions::READ,
            "View batches and availability",
        );
        insert(
            Resources::INVENTORY,
            Actions::WRITE,
            "Receive stock and transition locations",
        );
        insert(Resources::SALES, Actions::READ, "View sales snapshots");
        insert(Resources::SALES, Actions::WRITE, "Record sales");
        insert(Resources::SALES, Actions::DELETE, "Reverse recorded sales");
        insert(Resources::SHIPMENTS, Actions::READ, "View shipments");
        insert(
            Resources::SHIPMENTS,
            Actions::WRITE,
            "Create and deliver shipments",
        );
        insert(
            Resources::SNAPSHOTS,
            Actions::READ,
            "View warehouse snapshots and derived records",
        );
        insert(
            Resources::SNAPSHOTS,
            Actions::WRITE,
            "Enter and correct warehouse counts",
        );
        insert(
            Resources::SNAPSHOTS,
            Actions::DELETE,
            "Remove warehouse counts",
        );

        perms
    };

    /// Default grants per role. "admin" bypasses checks in the middleware
    /// and is not listed here.
    pub static ref ROLE_PERMISSIONS: HashMap<&'static str, Vec<&'static str>> = {
        let mut roles = HashMap::new();
        roles.insert(
            "operator",
            vec![
                consts::INVENTORY_READ,
                consts::INVENTORY_WRITE,
                consts::SALES_READ,
                consts::SALES_WRITE,
                consts::SHIPMENTS_READ,
                consts::SHIPMENTS_WRITE,
                consts::SNAPSHOTS_READ,
                consts::SNAPSHOTS_WRITE,
            ],
        );
        roles.insert(
            "accountant",
            vec![
                consts::INVENTORY_READ,
                consts::SALES_READ,
                consts::SALES_WRITE,
                consts::SALES_DELETE,
                consts::SNAPSHOTS_READ,
                consts::SNAPSHOTS_WRITE,
                consts::SNAPSHOTS_DELETE,
            ],
        );
        roles.insert(
            "viewer",
            vec![
                consts::INVENTORY_READ,
                consts::SALES_READ,
                consts::SHIPMENTS_READ,
                consts::SNAPSHOTS_READ,
            ],
        );
        roles
    };
}

/// Permissions granted to a role, empty for unknown roles.
pub fn permissions_for_role(role: &str) -> Vec<String> {
    ROLE_PERMISSIONS
        .get(role)
        .map(|perms| perms.iter().map(|p| p.to_string()).collect())
        .unwrap_or_default()
}
