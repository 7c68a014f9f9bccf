//! Session/auth state.
//!
//! One store per client process. It owns the current user and token, the
//! authenticated flag and the startup-validation flag, and publishes every
//! change on a watch channel so views (guard, sidebar, header) recompute
//! from the new state instead of reloading.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::client::IdentityProvider;
use crate::error::{ConsoleError, Result};
use crate::preferences::{MemoryTokenStore, TokenStore};
use crate::result_ext::ResultExt;
use crate::types::User;

/// Point-in-time view of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub is_validating: bool,
}

impl SessionSnapshot {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

pub struct SessionStore {
    state: watch::Sender<SessionSnapshot>,
    tokens: Arc<dyn TokenStore>,
    validation_started: AtomicBool,
}

impl SessionStore {
    /// Fresh store holding the persisted token, if any. Nobody is
    /// authenticated until startup validation or login succeeds, and the
    /// store starts out validating so nothing renders before that.
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        let initial = SessionSnapshot {
            user: None,
            token: tokens.load_token(),
            is_authenticated: false,
            is_validating: true,
        };
        let (state, _rx) = watch::channel(initial);
        Self {
            state,
            tokens,
            validation_started: AtomicBool::new(false),
        }
    }

    /// Store backed by process memory only.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::default()))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn is_validating(&self) -> bool {
        self.state.borrow().is_validating
    }

    pub fn set_auth(&self, user: User, token: String) {
        self.tokens.save_token(&token).log("persist session token").ok();
        tracing::info!("Authenticated user: {} ({})", user.email, user.id);
        self.state.send_modify(|s| {
            s.user = Some(user);
            s.token = Some(token);
            s.is_authenticated = true;
        });
    }

    pub fn clear_auth(&self) {
        self.tokens.clear_token().log("remove session token").ok();
        self.state.send_modify(|s| {
            s.user = None;
            s.token = None;
            s.is_authenticated = false;
        });
        tracing::debug!("Session cleared");
    }

    pub fn set_validating(&self, validating: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.is_validating != validating;
            s.is_validating = validating;
            changed
        });
    }

    /// Replace the user record; token and authentication are untouched.
    pub fn update_user(&self, user: User) {
        let mut replaced = false;
        self.state.send_if_modified(|s| {
            if s.user.is_none() {
                return false;
            }
            s.user = Some(user);
            replaced = true;
            true
        });
        if !replaced {
            tracing::warn!("update_user called without a signed-in user, ignoring");
        }
    }

    /// Startup token check. Runs once per store; later calls return the
    /// current snapshot without touching the backend.
    ///
    /// The server's answer always wins over local edits, so a refresh while
    /// previewing the staff view drops back to the real role.
    pub async fn validate_on_startup<P>(&self, identity: &P) -> SessionSnapshot
    where
        P: IdentityProvider + ?Sized,
    {
        if self.validation_started.swap(true, Ordering::SeqCst) {
            return self.snapshot();
        }

        let Some(token) = self.token() else {
            tracing::debug!("No stored token, starting signed out");
            self.set_validating(false);
            return self.snapshot();
        };

        self.set_validating(true);
        match identity.who_am_i(&token).await {
            Ok(Some(user)) => self.set_auth(user, token),
            Ok(None) => {
                tracing::warn!("Token check returned no user, clearing session");
                self.clear_auth();
            }
            Err(e) => {
                tracing::warn!("Token check failed, clearing session: {}", e);
                self.clear_auth();
            }
        }
        self.set_validating(false);

        self.snapshot()
    }

    /// Sign in. A failed login leaves the session signed out. Either way
    /// validation is over.
    pub async fn login<P>(&self, identity: &P, email: &str, password: &str) -> Result<User>
    where
        P: IdentityProvider + ?Sized,
    {
        match identity.login(email, password).await {
            Ok(res) => {
                if res.token.is_empty() {
                    self.clear_auth();
                    self.set_validating(false);
                    return Err(ConsoleError::InvalidResponse(
                        "login response carried an empty token".to_string(),
                    ));
                }
                self.set_auth(res.user.clone(), res.token);
                self.set_validating(false);
                Ok(res.user)
            }
            Err(e) => {
                tracing::warn!("Login failed for {}: {}", email, e);
                self.clear_auth();
                self.set_validating(false);
                Err(e)
            }
        }
    }

    /// Sign out. The backend call is best effort; the local session is
    /// always cleared.
    pub async fn logout<P>(&self, identity: &P)
    where
        P: IdentityProvider + ?Sized,
    {
        if let Some(token) = self.token() {
            identity.logout(&token).await.best_effort("backend logout");
        }
        self.clear_auth();
    }

    /// Clear the session if `err` is an authentication failure. Returns
    /// whether it did.
    pub fn handle_auth_error(&self, err: &ConsoleError) -> bool {
        if !err.is_auth_failure() {
            return false;
        }
        tracing::warn!("Authentication rejected by backend, signing out: {}", err);
        self.clear_auth();
        true
    }
}
