//! CRM Console access layer.
//!
//! Session lifecycle, permission checks, route guarding and the admin
//! "view as staff" preview for the CRM admin/staff dashboard, plus the HTTP
//! client and data models the dashboard views consume.
//!
//! Dependency order: [`permissions`] (pure) -> [`session`] -> [`guard`] ->
//! [`role_view`]. [`navigation`] ties them into the route table and sidebar.

pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod insights;
pub mod navigation;
pub mod permissions;
pub mod preferences;
pub mod resources;
pub mod result_ext;
pub mod role_view;
pub mod session;
pub mod types;

pub use client::{ConsoleClient, IdentityProvider};
pub use config::ConsoleConfig;
pub use error::{ConsoleError, Result};
pub use guard::{GuardDecision, RouteGuard};
pub use navigation::RouteTable;
pub use role_view::{RoleView, RoleViewSwitch};
pub use session::{SessionSnapshot, SessionStore};
pub use types::{Permission, Role, RoleField, User};
