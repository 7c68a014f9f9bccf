//! Route table, sidebar and header derived from the session.

use serde::Serialize;

use crate::config::NavigationConfig;
use crate::guard::{GuardDecision, RouteGuard, DEFAULT_REDIRECT};
use crate::permissions::{can_access_module, get_user_role};
use crate::role_view::{is_originally_admin, RoleView};
use crate::session::SessionSnapshot;
use crate::types::User;

/// One dashboard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub module: &'static str,
    pub label: &'static str,
    pub path: &'static str,
}

const fn item(module: &'static str, label: &'static str, path: &'static str) -> NavItem {
    NavItem {
        module,
        label,
        path,
    }
}

/// Sidebar order.
pub const NAV_ITEMS: [NavItem; 10] = [
    item("dashboard", "Dashboard", "/dashboard"),
    item("leads", "Leads", "/leads"),
    item("campaigns", "Campaigns", "/campaigns"),
    item("calls", "Calls", "/calls"),
    item("integrations", "Integrations", "/integrations"),
    item("ai-insights", "AI Insights", "/ai-insights"),
    item("users", "Users", "/users"),
    item("roles", "Roles", "/roles"),
    item("audit-logs", "Audit Logs", "/audit-logs"),
    item("settings", "Settings", "/settings"),
];

pub const PUBLIC_PATHS: [&str; 1] = ["/login"];

/// Guards for every dashboard path, sharing one fallback route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    redirect_to: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            redirect_to: DEFAULT_REDIRECT.to_string(),
        }
    }
}

impl RouteTable {
    pub fn from_config(config: &NavigationConfig) -> Self {
        Self {
            redirect_to: config.redirect_to.clone(),
        }
    }

    /// Guard for a path. Admin-only modules get an admin guard; every other
    /// page only needs a signed-in user. Public paths have none.
    pub fn guard_for(&self, path: &str) -> Option<RouteGuard> {
        if PUBLIC_PATHS.contains(&module_path(path)) {
            return None;
        }
        let guard = RouteGuard::default().redirect_to(&self.redirect_to);
        if !can_access_module(None, module_for(path)) {
            return Some(guard.require_admin(true));
        }
        Some(guard)
    }

    /// Resolve a navigation against the session.
    pub fn navigate(&self, path: &str, session: &SessionSnapshot) -> GuardDecision {
        match self.guard_for(path) {
            Some(guard) => guard.evaluate(session),
            None => GuardDecision::Render,
        }
    }
}

fn module_path(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

/// Module name for a path: its first segment, or `dashboard` for `/`.
pub fn module_for(path: &str) -> &str {
    path.trim_start_matches('/')
        .split(['/', '?', '#'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("dashboard")
}

/// Sidebar entries visible to the user as currently presented.
pub fn sidebar(user: Option<&User>) -> Vec<NavItem> {
    if user.is_none() {
        return Vec::new();
    }
    NAV_ITEMS
        .iter()
        .filter(|item| can_access_module(user, item.module))
        .copied()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderInfo {
    pub name: String,
    pub role_label: String,
    pub view: RoleView,
    /// Show the "view as staff" toggle.
    pub can_switch_view: bool,
}

pub fn header(user: &User) -> HeaderInfo {
    let role_label = user
        .role
        .as_ref()
        .and_then(|r| r.display_name())
        .map(str::to_string)
        .unwrap_or_else(|| get_user_role(Some(user)));

    HeaderInfo {
        name: user.name.clone(),
        role_label,
        view: RoleView::of(user),
        can_switch_view: is_originally_admin(Some(user)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role_view::impersonate_staff;
    use crate::session::tests::admin_user;

    fn signed_in(user: User) -> SessionSnapshot {
        SessionSnapshot {
            user: Some(user),
            token: Some("tok".to_string()),
            is_authenticated: true,
            is_validating: false,
        }
    }

    #[test]
    fn test_module_for() {
        assert_eq!(module_for("/leads"), "leads");
        assert_eq!(module_for("/leads/42/edit"), "leads");
        assert_eq!(module_for("/audit-logs?page=2"), "audit-logs");
        assert_eq!(module_for("/"), "dashboard");
    }

    #[test]
    fn test_guard_table() {
        let routes = RouteTable::default();
        assert!(routes.guard_for("/login").is_none());
        assert!(routes.guard_for("/login?next=/leads").is_none());
        assert!(routes.guard_for("/settings").unwrap().require_admin);
        assert!(routes.guard_for("/roles/3").unwrap().require_admin);
        assert!(!routes.guard_for("/leads").unwrap().require_admin);
        assert!(!routes.guard_for("/unknown").unwrap().require_admin);
    }

    #[test]
    fn test_admin_sidebar_and_staff_preview() {
        let admin = admin_user();
        assert_eq!(sidebar(Some(&admin)).len(), NAV_ITEMS.len());

        let previewing = impersonate_staff(&admin);
        let items: Vec<&str> = sidebar(Some(&previewing)).iter().map(|i| i.module).collect();
        assert_eq!(
            items,
            ["dashboard", "leads", "campaigns", "calls", "integrations", "ai-insights"]
        );
        assert!(sidebar(None).is_empty());
    }

    #[test]
    fn test_navigate_follows_preview() {
        let routes = RouteTable::default();
        let admin = admin_user();
        assert!(routes.navigate("/users", &signed_in(admin.clone())).is_render());

        let previewing = signed_in(impersonate_staff(&admin));
        assert_eq!(
            routes.navigate("/users", &previewing).redirect_target(),
            Some("/dashboard")
        );
        assert!(routes.navigate("/leads", &previewing).is_render());
        assert!(routes.navigate("/login", &SessionSnapshot::default()).is_render());
        assert_eq!(
            routes.navigate("/leads", &SessionSnapshot::default()).redirect_target(),
            Some("/login")
        );
    }

    #[test]
    fn test_configured_fallback_route() {
        let routes = RouteTable::from_config(&NavigationConfig {
            redirect_to: "/leads".to_string(),
        });
        let previewing = signed_in(impersonate_staff(&admin_user()));
        assert_eq!(
            routes.navigate("/settings", &previewing).redirect_target(),
            Some("/leads")
        );
    }

    #[test]
    fn test_header() {
        let admin = admin_user();
        let info = header(&admin);
        assert_eq!(info.role_label, "Super Admin");
        assert_eq!(info.view, RoleView::Normal);
        assert!(info.can_switch_view);

        let info = header(&impersonate_staff(&admin));
        assert_eq!(info.role_label, "Staff");
        assert_eq!(info.view, RoleView::ImpersonatingStaff);
        assert!(info.can_switch_view);
    }
}
