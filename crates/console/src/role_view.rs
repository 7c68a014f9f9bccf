//! Admin "view as staff" preview.
//!
//! The preview lives only in the session's user record: entering it stashes
//! the real role in `original_role_id` / `original_role` and installs the
//! staff role, leaving it restores the stash. The current view is derived
//! from the record ([`RoleView::of`]) and every switch goes through
//! [`SessionStore::update_user`], so subscribers recompute without a reload.
//!
//! Nothing is sent to the backend. The next startup validation installs the
//! server's user and the preview is gone.

use serde::Serialize;

use crate::error::{ConsoleError, Result};
use crate::permissions::{is_admin, ADMIN_ROLE_ID, ADMIN_ROLE_NAMES};
use crate::result_ext::OptionResultExt;
use crate::session::SessionStore;
use crate::types::{Role, RoleField, User};

pub const STAFF_ROLE_ID: i64 = 2;
pub const STAFF_ROLE_NAME: &str = "staff";
pub const STAFF_DISPLAY_NAME: &str = "Staff";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleView {
    Normal,
    ImpersonatingStaff,
}

impl RoleView {
    pub fn of(user: &User) -> Self {
        if user.is_impersonating() {
            RoleView::ImpersonatingStaff
        } else {
            RoleView::Normal
        }
    }
}

/// Admin check against the real role, so the toggle stays available while
/// the user is presenting as staff.
pub fn is_originally_admin(user: Option<&User>) -> bool {
    let Some(u) = user else {
        return false;
    };
    match u.original_role_id {
        Some(original_id) => {
            original_id == ADMIN_ROLE_ID
                || u
                    .original_role
                    .as_ref()
                    .and_then(RoleField::name)
                    .is_some_and(|name| ADMIN_ROLE_NAMES.contains(&name))
        }
        None => is_admin(user),
    }
}

/// Staff version of `user` with the real role stashed. Fields of a detailed
/// role other than the labels are carried over.
pub fn impersonate_staff(user: &User) -> User {
    let staff_role = match &user.role {
        Some(RoleField::Detailed(role)) => Role {
            name: STAFF_ROLE_NAME.to_string(),
            display_name: Some(STAFF_DISPLAY_NAME.to_string()),
            ..role.clone()
        },
        _ => Role::named(STAFF_ROLE_NAME, STAFF_DISPLAY_NAME),
    };

    User {
        // The stash marks the preview, so it must be set even when the
        // admin was recognised by role name alone.
        original_role_id: Some(user.role_id.unwrap_or(ADMIN_ROLE_ID)),
        original_role: user.role.clone(),
        role_id: Some(STAFF_ROLE_ID),
        role: Some(RoleField::Detailed(staff_role)),
        ..user.clone()
    }
}

/// Real-role version of `user`. Falls back to the super admin role if the
/// stash is incomplete.
pub fn restore_original(user: &User) -> User {
    let role_id = user
        .original_role_id
        .log_none("stashed role id")
        .unwrap_or(ADMIN_ROLE_ID);
    let role = user
        .original_role
        .clone()
        .log_none("stashed role")
        .unwrap_or_else(|| RoleField::Detailed(Role::named("super_admin", "Super Admin")));

    User {
        role_id: Some(role_id),
        role: Some(role),
        original_role_id: None,
        original_role: None,
        ..user.clone()
    }
}

/// Role-view toggle bound to a session.
pub struct RoleViewSwitch<'a> {
    session: &'a SessionStore,
}

impl<'a> RoleViewSwitch<'a> {
    pub fn new(session: &'a SessionStore) -> Self {
        Self { session }
    }

    /// Current view, `None` when signed out.
    pub fn current(&self) -> Option<RoleView> {
        self.session.user().as_ref().map(RoleView::of)
    }

    /// Whether the toggle is offered at all.
    pub fn is_available(&self) -> bool {
        is_originally_admin(self.session.user().as_ref())
    }

    /// Normal -> ImpersonatingStaff. Already previewing is a no-op.
    pub fn enter_staff_view(&self) -> Result<RoleView> {
        let user = self.switchable_user()?;
        if user.is_impersonating() {
            return Ok(RoleView::ImpersonatingStaff);
        }
        tracing::info!(user_id = user.id, "Switching to staff view");
        self.session.update_user(impersonate_staff(&user));
        Ok(RoleView::ImpersonatingStaff)
    }

    /// ImpersonatingStaff -> Normal. Already normal is a no-op.
    pub fn exit_staff_view(&self) -> Result<RoleView> {
        let user = self.switchable_user()?;
        if !user.is_impersonating() {
            return Ok(RoleView::Normal);
        }
        tracing::info!(user_id = user.id, "Returning to admin view");
        self.session.update_user(restore_original(&user));
        Ok(RoleView::Normal)
    }

    pub fn toggle(&self) -> Result<RoleView> {
        match self.current() {
            Some(RoleView::ImpersonatingStaff) => self.exit_staff_view(),
            _ => self.enter_staff_view(),
        }
    }

    fn switchable_user(&self) -> Result<User> {
        let user = self
            .session
            .user()
            .ok_or_else(|| ConsoleError::Unauthorized("no signed-in user".to_string()))?;
        if !is_originally_admin(Some(&user)) {
            return Err(ConsoleError::Forbidden(
                "role view switching is limited to admins".to_string(),
            ));
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{admin_user, FakeIdentity, WhoAmI};

    fn signed_in_admin() -> SessionStore {
        let store = SessionStore::in_memory();
        store.set_auth(admin_user(), "tok".to_string());
        store
    }

    #[test]
    fn test_round_trip_restores_original_role() {
        let store = signed_in_admin();
        let switch = RoleViewSwitch::new(&store);
        let original = store.user().unwrap();

        assert_eq!(switch.enter_staff_view().unwrap(), RoleView::ImpersonatingStaff);
        let staff = store.user().unwrap();
        assert_eq!(staff.role_id, Some(2));
        assert_eq!(staff.original_role_id, Some(1));
        assert_eq!(staff.role_name(), Some("staff"));
        assert!(!is_admin(Some(&staff)));
        assert!(is_originally_admin(Some(&staff)));

        assert_eq!(switch.exit_staff_view().unwrap(), RoleView::Normal);
        let restored = store.user().unwrap();
        assert_eq!(restored.role_id, Some(1));
        assert_eq!(restored.original_role_id, None);
        assert_eq!(restored.original_role, None);
        assert_eq!(restored, original);
    }

    #[test]
    fn test_switch_keeps_session_authenticated() {
        let store = signed_in_admin();
        RoleViewSwitch::new(&store).enter_staff_view().unwrap();
        let snap = store.snapshot();
        assert!(snap.is_authenticated);
        assert_eq!(snap.token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_subscribers_notified_on_switch() {
        let store = signed_in_admin();
        let mut rx = store.subscribe();
        RoleViewSwitch::new(&store).toggle().unwrap();
        assert!(rx.has_changed().unwrap());
        let view = rx.borrow_and_update().user().map(RoleView::of);
        assert_eq!(view, Some(RoleView::ImpersonatingStaff));
    }

    #[test]
    fn test_enter_twice_is_noop() {
        let store = signed_in_admin();
        let switch = RoleViewSwitch::new(&store);
        switch.enter_staff_view().unwrap();
        switch.enter_staff_view().unwrap();
        assert_eq!(store.user().unwrap().original_role_id, Some(1));
        switch.exit_staff_view().unwrap();
        assert_eq!(switch.exit_staff_view().unwrap(), RoleView::Normal);
    }

    #[test]
    fn test_staff_cannot_switch() {
        let store = SessionStore::in_memory();
        store.set_auth(
            User {
                id: 5,
                role_id: Some(2),
                role: Some(RoleField::Detailed(Role::named("staff", "Staff"))),
                ..Default::default()
            },
            "tok".to_string(),
        );
        let switch = RoleViewSwitch::new(&store);
        assert!(!switch.is_available());
        assert!(switch.enter_staff_view().unwrap_err().is_authorization_failure());
    }

    #[test]
    fn test_signed_out_cannot_switch() {
        let store = SessionStore::in_memory();
        let switch = RoleViewSwitch::new(&store);
        assert_eq!(switch.current(), None);
        assert!(switch.toggle().unwrap_err().is_auth_failure());
    }

    #[test]
    fn test_restore_without_stash_falls_back_to_super_admin() {
        let broken = User {
            id: 1,
            role_id: Some(2),
            role: Some(RoleField::Detailed(Role::named("staff", "Staff"))),
            original_role_id: Some(1),
            ..Default::default()
        };
        let restored = restore_original(&broken);
        assert_eq!(restored.role_id, Some(1));
        assert_eq!(restored.role_name(), Some("super_admin"));
        assert!(!restored.is_impersonating());
    }

    #[test]
    fn test_admin_by_name_only_can_round_trip() {
        let user = User {
            id: 9,
            role_id: None,
            role: Some(RoleField::Detailed(Role::named("Admin", "Admin"))),
            ..Default::default()
        };
        let staff = impersonate_staff(&user);
        assert!(staff.is_impersonating());
        assert!(is_originally_admin(Some(&staff)));
        let back = restore_original(&staff);
        assert_eq!(back.role, user.role);
        assert!(is_admin(Some(&back)));
    }

    #[tokio::test]
    async fn test_startup_validation_discards_preview() {
        let store = SessionStore::new(std::sync::Arc::new(
            crate::preferences::MemoryTokenStore::with_token("tok"),
        ));
        store.set_auth(impersonate_staff(&admin_user()), "tok".to_string());
        assert_eq!(RoleViewSwitch::new(&store).current(), Some(RoleView::ImpersonatingStaff));

        let identity = FakeIdentity::new(WhoAmI::User(admin_user()));
        store.validate_on_startup(&identity).await;

        assert_eq!(RoleViewSwitch::new(&store).current(), Some(RoleView::Normal));
        assert_eq!(store.user().unwrap().role_id, Some(1));
    }
}
