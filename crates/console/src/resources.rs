//! CRM resources and per-view fetch state.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::client::ConsoleClient;
use crate::error::ConsoleError;

/// Resource collections the console lists and mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Leads,
    Campaigns,
    Calls,
    Integrations,
    Roles,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Leads,
        ResourceKind::Campaigns,
        ResourceKind::Calls,
        ResourceKind::Integrations,
        ResourceKind::Roles,
    ];

    /// Collection key in list responses, and the permission prefix.
    pub fn key(&self) -> &'static str {
        match self {
            ResourceKind::Leads => "leads",
            ResourceKind::Campaigns => "campaigns",
            ResourceKind::Calls => "calls",
            ResourceKind::Integrations => "integrations",
            ResourceKind::Roles => "roles",
        }
    }

    pub fn singular(&self) -> &'static str {
        match self {
            ResourceKind::Leads => "lead",
            ResourceKind::Campaigns => "campaign",
            ResourceKind::Calls => "call",
            ResourceKind::Integrations => "integration",
            ResourceKind::Roles => "role",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Leads => "/leads",
            ResourceKind::Campaigns => "/campaigns",
            ResourceKind::Calls => "/calls",
            ResourceKind::Integrations => "/integrations",
            ResourceKind::Roles => "/roles",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ResourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.key() == s || k.singular() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown resource '{}'", s))
    }
}

/// Pull the item array out of a list response.
///
/// Probe order: `data` array, `<resource>` array, `data.<resource>` array,
/// bare top-level array. Anything else yields no items.
pub fn extract_items(body: &Value, kind: ResourceKind) -> Vec<Value> {
    let key = kind.key();
    let candidates = [
        body.get("data"),
        body.get(key),
        body.get("data").and_then(|d| d.get(key)),
        Some(body),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_array().cloned())
        .unwrap_or_default()
}

/// Load state of a list view.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FetchState<T> {
    #[default]
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            FetchState::Loaded(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::Failed(msg) => Some(msg.as_str()),
            _ => None,
        }
    }
}

/// A list view: one resource kind plus its fetch state.
///
/// Failures stay inside the view as `Failed` with a message; the user
/// retries by hand. Authentication failures are the exception the caller
/// must act on, so `load` hands them back.
#[derive(Debug, Clone)]
pub struct ResourceView {
    kind: ResourceKind,
    state: FetchState<Vec<Value>>,
}

impl ResourceView {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            state: FetchState::Idle,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn state(&self) -> &FetchState<Vec<Value>> {
        &self.state
    }

    /// Fetch the list and record the outcome. Returns the error only when it
    /// is an authentication failure.
    pub async fn load(&mut self, client: &ConsoleClient, token: &str) -> Option<ConsoleError> {
        self.state = FetchState::Loading;
        let result = client.list(token, self.kind).await;
        self.apply(result)
    }

    pub async fn retry(&mut self, client: &ConsoleClient, token: &str) -> Option<ConsoleError> {
        tracing::debug!(resource = self.kind.key(), "Retrying fetch");
        self.load(client, token).await
    }

    fn apply(&mut self, result: Result<Vec<Value>, ConsoleError>) -> Option<ConsoleError> {
        match result {
            Ok(items) => {
                self.state = FetchState::Loaded(items);
                None
            }
            Err(e) => {
                tracing::warn!(resource = self.kind.key(), error = %e, "Fetch failed");
                self.state = FetchState::Failed(e.to_string());
                e.is_auth_failure().then_some(e)
            }
        }
    }
}
