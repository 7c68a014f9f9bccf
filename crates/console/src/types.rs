//! User, role and permission records as the backend sends them.
//!
//! The backend is not consistent about shapes: a role may be an object or a
//! legacy bare string, and a permission may be a string or an object carrying
//! `name` and/or `slug`. Both are modelled as untagged sum types so every
//! variant deserializes, and the fallback order is made explicit in
//! [`User::permission_set`].

use serde::{Deserialize, Serialize};

/// A single permission entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Permission {
    /// `"leads.edit"`
    Name(String),
    /// `{ "name": "leads.edit", "slug": "leads.edit", ... }`
    Object {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slug: Option<String>,
    },
}

impl Permission {
    /// Three-way match: the bare string, the object's `name`, or its `slug`.
    pub fn matches(&self, requested: &str) -> bool {
        match self {
            Permission::Name(name) => name == requested,
            Permission::Object { name, slug } => {
                name.as_deref() == Some(requested) || slug.as_deref() == Some(requested)
            }
        }
    }
}

impl From<&str> for Permission {
    fn from(value: &str) -> Self {
        Permission::Name(value.to_string())
    }
}

/// Role object attached to a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
}

impl Role {
    pub fn named(name: &str, display_name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            display_name: Some(display_name.to_string()),
            permissions: None,
        }
    }
}

/// The `role` field: an object, or a bare role name from older backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleField {
    Detailed(Role),
    Legacy(String),
}

impl RoleField {
    /// `role.name` of a detailed role. Legacy roles have no `.name`.
    pub fn name(&self) -> Option<&str> {
        match self {
            RoleField::Detailed(role) if !role.name.is_empty() => Some(role.name.as_str()),
            _ => None,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            RoleField::Detailed(role) => role.display_name.as_deref(),
            RoleField::Legacy(_) => None,
        }
    }

    pub fn permissions(&self) -> Option<&[Permission]> {
        match self {
            RoleField::Detailed(role) => role.permissions.as_deref(),
            RoleField::Legacy(_) => None,
        }
    }
}

/// Authenticated user as returned by the who-am-I and login endpoints.
///
/// `original_role_id` / `original_role` are only present while an admin is
/// previewing the staff view; see [`crate::role_view`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
    #[serde(
        rename = "_originalRoleId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub original_role_id: Option<i64>,
    #[serde(
        rename = "_originalRole",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub original_role: Option<RoleField>,
}

impl User {
    /// Effective permission set.
    ///
    /// `permissions` wins whenever present, even when empty; otherwise the
    /// role's list; otherwise nothing.
    pub fn permission_set(&self) -> &[Permission] {
        if let Some(perms) = self.permissions.as_deref() {
            return perms;
        }
        self.role
            .as_ref()
            .and_then(RoleField::permissions)
            .unwrap_or(&[])
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().and_then(RoleField::name)
    }

    pub fn is_impersonating(&self) -> bool {
        self.original_role_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_deserialization_detailed_role() {
        let json = serde_json::json!({
            "id": 7,
            "name": "Ada",
            "email": "ada@example.com",
            "role_id": 2,
            "role": {
                "id": 2,
                "name": "staff",
                "display_name": "Staff",
                "permissions": ["leads.view", {"name": "leads.edit"}, {"slug": "calls.view"}]
            }
        });

        let user: User = serde_json::from_value(json).unwrap();
        assert_eq!(user.role_id, Some(2));
        assert_eq!(user.role_name(), Some("staff"));
        assert_eq!(user.permission_set().len(), 3);
        assert!(!user.is_impersonating());
    }

    #[test]
    fn test_user_deserialization_legacy_role() {
        let json = serde_json::json!({"id": 3, "role": "manager"});
        let user: User = serde_json::from_value(json).unwrap();
        assert_eq!(user.role, Some(RoleField::Legacy("manager".to_string())));
        assert_eq!(user.role_name(), None);
        assert!(user.permission_set().is_empty());
    }

    #[test]
    fn test_original_role_wire_names() {
        let user = User {
            id: 1,
            role_id: Some(2),
            original_role_id: Some(1),
            original_role: Some(RoleField::Detailed(Role::named("super_admin", "Super Admin"))),
            ..Default::default()
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["_originalRoleId"], 1);
        assert_eq!(json["_originalRole"]["name"], "super_admin");

        let back: User = serde_json::from_value(json).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_flat_permissions_take_precedence_even_when_empty() {
        let user = User {
            id: 1,
            permissions: Some(vec![]),
            role: Some(RoleField::Detailed(Role {
                permissions: Some(vec!["leads.view".into()]),
                ..Role::named("staff", "Staff")
            })),
            ..Default::default()
        };
        assert!(user.permission_set().is_empty());
    }

    #[test]
    fn test_permission_matching() {
        assert!(Permission::from("leads.edit").matches("leads.edit"));
        let by_name = Permission::Object {
            name: Some("leads.edit".into()),
            slug: None,
        };
        let by_slug = Permission::Object {
            name: Some("Edit leads".into()),
            slug: Some("leads.edit".into()),
        };
        assert!(by_name.matches("leads.edit"));
        assert!(by_slug.matches("leads.edit"));
        assert!(!by_slug.matches("leads.delete"));
    }
}
