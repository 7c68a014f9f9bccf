//! Permission evaluator.
//!
//! Pure functions deriving authorization facts from an optional user. Nothing
//! here fails: an absent user or a malformed record degrades to `false` or to
//! a default label.

use serde::Deserialize;

use crate::types::{RoleField, User};

/// Role id the backend assigns to super admins.
pub const ADMIN_ROLE_ID: i64 = 1;

/// Role names recognised as admin. Matching is exact and case-sensitive.
pub const ADMIN_ROLE_NAMES: [&str; 3] = ["super_admin", "Super Admin", "Admin"];

/// Modules only admins may open.
pub const ADMIN_MODULES: [&str; 4] = ["users", "roles", "audit-logs", "settings"];

/// One permission or a list of them; `has_permission` accepts either.
#[derive(Debug, Clone, Copy)]
pub enum PermissionQuery<'a> {
    One(&'a str),
    Any(&'a [&'a str]),
}

impl<'a> PermissionQuery<'a> {
    fn as_slice(&self) -> &[&'a str] {
        match self {
            PermissionQuery::One(p) => std::slice::from_ref(p),
            PermissionQuery::Any(list) => list,
        }
    }
}

impl<'a> From<&'a str> for PermissionQuery<'a> {
    fn from(value: &'a str) -> Self {
        PermissionQuery::One(value)
    }
}

impl<'a> From<&'a [&'a str]> for PermissionQuery<'a> {
    fn from(value: &'a [&'a str]) -> Self {
        PermissionQuery::Any(value)
    }
}

impl<'a, const N: usize> From<&'a [&'a str; N]> for PermissionQuery<'a> {
    fn from(value: &'a [&'a str; N]) -> Self {
        PermissionQuery::Any(value.as_slice())
    }
}

/// Ownership fields a CRM record may carry. Deserializes from any resource
/// JSON; unrelated fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Ownership {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub created_by: Option<i64>,
    #[serde(default)]
    pub assigned_to: Option<i64>,
    #[serde(default)]
    pub owner_id: Option<i64>,
}

impl Ownership {
    /// Lenient extraction from a raw record; non-integer fields count as absent.
    pub fn from_json(record: &serde_json::Value) -> Self {
        let field = |key: &str| record.get(key).and_then(serde_json::Value::as_i64);
        Self {
            user_id: field("user_id"),
            created_by: field("created_by"),
            assigned_to: field("assigned_to"),
            owner_id: field("owner_id"),
        }
    }
}

pub fn is_admin(user: Option<&User>) -> bool {
    let Some(user) = user else {
        return false;
    };
    user.role_id == Some(ADMIN_ROLE_ID)
        || user
            .role_name()
            .is_some_and(|name| ADMIN_ROLE_NAMES.contains(&name))
}

/// True if the user holds ANY of the requested permissions. Admins always do.
pub fn has_permission<'a>(user: Option<&User>, query: impl Into<PermissionQuery<'a>>) -> bool {
    let Some(u) = user else {
        return false;
    };
    if is_admin(user) {
        return true;
    }
    let granted = u.permission_set();
    query
        .into()
        .as_slice()
        .iter()
        .any(|requested| granted.iter().any(|p| p.matches(requested)))
}

/// True if the user holds EVERY requested permission. An empty request is
/// satisfied by any present user.
pub fn has_all_permissions(user: Option<&User>, requested: &[&str]) -> bool {
    let Some(u) = user else {
        return false;
    };
    if is_admin(user) {
        return true;
    }
    let granted = u.permission_set();
    requested
        .iter()
        .all(|requested| granted.iter().any(|p| p.matches(requested)))
}

/// Admin-only modules need `is_admin`; everything else is open. Does not
/// check authentication.
pub fn can_access_module(user: Option<&User>, module: &str) -> bool {
    if ADMIN_MODULES.contains(&module) {
        return is_admin(user);
    }
    true
}

pub fn can_perform_action(user: Option<&User>, action: &str, resource: &str) -> bool {
    if is_admin(user) {
        return true;
    }
    let permission = format!("{}.{}", resource, action);
    has_permission(user, permission.as_str())
}

pub fn is_owner(user: Option<&User>, resource: Option<&Ownership>) -> bool {
    let (Some(user), Some(resource)) = (user, resource) else {
        return false;
    };
    [
        resource.user_id,
        resource.created_by,
        resource.assigned_to,
        resource.owner_id,
    ]
    .contains(&Some(user.id))
}

/// Role label: `role.name`, then a legacy string role, then `"Staff"`.
/// `"Guest"` when nobody is signed in.
pub fn get_user_role(user: Option<&User>) -> String {
    let Some(user) = user else {
        return "Guest".to_string();
    };
    match &user.role {
        Some(RoleField::Detailed(role)) if !role.name.is_empty() => role.name.clone(),
        Some(RoleField::Legacy(name)) if !name.is_empty() => name.clone(),
        _ => "Staff".to_string(),
    }
}
