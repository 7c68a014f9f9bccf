//! Route guard for protected views.

use serde::Serialize;

use crate::permissions::{has_all_permissions, is_admin};
use crate::session::SessionSnapshot;

pub const LOGIN_PATH: &str = "/login";
pub const DEFAULT_REDIRECT: &str = "/dashboard";

/// Why a navigation was turned away. Lets an "Access Denied" view explain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenyReason {
    Unauthenticated,
    NotAdmin,
    MissingPermissions { required: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub to: String,
    /// Replace the current history entry so Back cannot re-enter the page.
    pub replace: bool,
    #[serde(flatten)]
    pub reason: DenyReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Startup validation still running; show the blocking loader.
    Loading,
    Render,
    Redirect(Redirect),
}

impl GuardDecision {
    pub fn is_render(&self) -> bool {
        matches!(self, GuardDecision::Render)
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            GuardDecision::Redirect(r) => Some(r.to.as_str()),
            _ => None,
        }
    }
}

/// Guard settings for one protected view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    pub require_admin: bool,
    pub required_permissions: Vec<String>,
    pub redirect_to: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            require_admin: false,
            required_permissions: Vec::new(),
            redirect_to: DEFAULT_REDIRECT.to_string(),
        }
    }
}

impl RouteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admin() -> Self {
        Self::default().require_admin(true)
    }

    pub fn require_admin(mut self, require_admin: bool) -> Self {
        self.require_admin = require_admin;
        self
    }

    pub fn permissions(mut self, permissions: &[&str]) -> Self {
        self.required_permissions = permissions.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn redirect_to(mut self, path: &str) -> Self {
        self.redirect_to = path.to_string();
        self
    }

    /// Decide what a navigation to the guarded view does.
    ///
    /// Checks run in order: validation in progress, authentication, admin
    /// requirement, required permissions. The first failing check decides.
    pub fn evaluate(&self, session: &SessionSnapshot) -> GuardDecision {
        if session.is_validating {
            return GuardDecision::Loading;
        }

        let user = match session.user() {
            Some(user) if session.is_authenticated => user,
            _ => return self.deny(LOGIN_PATH, DenyReason::Unauthenticated),
        };

        if self.require_admin && !is_admin(Some(user)) {
            return self.deny(&self.redirect_to, DenyReason::NotAdmin);
        }

        if !self.required_permissions.is_empty() {
            let required: Vec<&str> = self
                .required_permissions
                .iter()
                .map(String::as_str)
                .collect();
            if !has_all_permissions(Some(user), &required) {
                return self.deny(
                    &self.redirect_to,
                    DenyReason::MissingPermissions {
                        required: self.required_permissions.clone(),
                    },
                );
            }
        }

        GuardDecision::Render
    }

    fn deny(&self, to: &str, reason: DenyReason) -> GuardDecision {
        tracing::debug!(to, ?reason, "Route guard redirect");
        GuardDecision::Redirect(Redirect {
            to: to.to_string(),
            replace: true,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::admin_user;
    use crate::types::{Role, RoleField, User};

    fn staff_user(perms: &[&str]) -> User {
        User {
            id: 2,
            email: "staff@example.com".to_string(),
            role_id: Some(2),
            role: Some(RoleField::Detailed(Role::named("staff", "Staff"))),
            permissions: Some(perms.iter().map(|p| (*p).into()).collect()),
            ..Default::default()
        }
    }

    fn signed_in(user: User) -> SessionSnapshot {
        SessionSnapshot {
            user: Some(user),
            token: Some("tok".to_string()),
            is_authenticated: true,
            is_validating: false,
        }
    }

    #[test]
    fn test_unauthenticated_goes_to_login_before_admin_check() {
        let session = SessionSnapshot::default();
        let decision = RouteGuard::admin().evaluate(&session);
        assert_eq!(
            decision,
            GuardDecision::Redirect(Redirect {
                to: "/login".to_string(),
                replace: true,
                reason: DenyReason::Unauthenticated,
            })
        );
    }

    #[test]
    fn test_user_without_authentication_flag_goes_to_login() {
        let session = SessionSnapshot {
            is_authenticated: false,
            ..signed_in(admin_user())
        };
        assert_eq!(RouteGuard::new().evaluate(&session).redirect_target(), Some("/login"));
    }

    #[test]
    fn test_non_admin_redirected_to_fallback() {
        let session = signed_in(staff_user(&[]));
        let decision = RouteGuard::admin().redirect_to("/dashboard").evaluate(&session);
        assert_eq!(decision.redirect_target(), Some("/dashboard"));
        assert!(matches!(
            decision,
            GuardDecision::Redirect(Redirect { reason: DenyReason::NotAdmin, replace: true, .. })
        ));
    }

    #[test]
    fn test_admin_renders() {
        let session = signed_in(admin_user());
        assert!(RouteGuard::admin().evaluate(&session).is_render());
        assert!(RouteGuard::new()
            .permissions(&["roles.delete"])
            .evaluate(&session)
            .is_render());
    }

    #[test]
    fn test_required_permissions_all_needed() {
        let session = signed_in(staff_user(&["leads.view"]));
        let guard = RouteGuard::new()
            .permissions(&["leads.view", "leads.edit"])
            .redirect_to("/leads");
        let decision = guard.evaluate(&session);
        assert_eq!(decision.redirect_target(), Some("/leads"));

        let session = signed_in(staff_user(&["leads.view", "leads.edit"]));
        assert!(guard.evaluate(&session).is_render());
    }

    #[test]
    fn test_no_requirements_renders_for_any_user() {
        assert!(RouteGuard::default()
            .evaluate(&signed_in(staff_user(&[])))
            .is_render());
    }

    #[test]
    fn test_validating_blocks_rendering() {
        let session = SessionSnapshot {
            is_validating: true,
            ..signed_in(admin_user())
        };
        assert_eq!(RouteGuard::new().evaluate(&session), GuardDecision::Loading);
    }

    #[test]
    fn test_decision_serializes_with_reason() {
        let session = signed_in(staff_user(&[]));
        let decision = RouteGuard::new().permissions(&["calls.view"]).evaluate(&session);
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["decision"], "redirect");
        assert_eq!(json["reason"], "missing_permissions");
        assert_eq!(json["required"][0], "calls.view");
    }
}
