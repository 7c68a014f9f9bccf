//! HTTP client for the CRM backend.
//!
//! Every call carries the session token as a bearer credential. Status codes
//! are mapped onto [`ConsoleError`] so callers can tell an expired session
//! (401) from a permission problem (403) from everything else.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::{ConsoleError, Result};
use crate::insights::LeadDistribution;
use crate::resources::{extract_items, ResourceKind};
use crate::types::User;

/// Body of the who-am-I endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    #[serde(default)]
    pub user: Option<User>,
}

/// Body of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    #[serde(alias = "access_token")]
    pub token: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Backend identity operations the session depends on.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the user behind a token. `Ok(None)` means the backend
    /// answered but sent no user.
    async fn who_am_i(&self, token: &str) -> Result<Option<User>>;

    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse>;

    async fn logout(&self, token: &str) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct ConsoleClient {
    base_url: String,
    http: reqwest::Client,
}

impl ConsoleClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::with_timeout(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode a JSON body, mapping failure statuses.
    async fn send_json(&self, req: reqwest::RequestBuilder) -> Result<serde_json::Value> {
        let res = req.send().await?;
        let status = res.status();
        let body = res.text().await?;

        match status {
            s if s.is_success() => {
                if body.trim().is_empty() {
                    return Ok(serde_json::Value::Null);
                }
                Ok(serde_json::from_str(&body)?)
            }
            StatusCode::UNAUTHORIZED => Err(ConsoleError::Unauthorized(body)),
            StatusCode::FORBIDDEN => Err(ConsoleError::Forbidden(body)),
            s => Err(ConsoleError::Http {
                status: s.as_u16(),
                body,
            }),
        }
    }

    /// GET /{resource}
    pub async fn list(&self, token: &str, kind: ResourceKind) -> Result<Vec<serde_json::Value>> {
        let req = self.http.get(self.url(kind.path())).bearer_auth(token);
        let body = self.send_json(req).await?;
        let items = extract_items(&body, kind);
        tracing::debug!(resource = kind.key(), count = items.len(), "Listed resources");
        Ok(items)
    }

    /// GET /{resource}/{id}. Detail responses may be wrapped in `data` or
    /// under the singular key.
    pub async fn get(&self, token: &str, kind: ResourceKind, id: i64) -> Result<serde_json::Value> {
        let req = self
            .http
            .get(self.url(&format!("{}/{}", kind.path(), id)))
            .bearer_auth(token);
        let body = self.send_json(req).await?;
        Ok(unwrap_record(body, kind))
    }

    /// POST /{resource}
    pub async fn create(
        &self,
        token: &str,
        kind: ResourceKind,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let req = self
            .http
            .post(self.url(kind.path()))
            .bearer_auth(token)
            .json(payload);
        let body = self.send_json(req).await?;
        tracing::info!(resource = kind.key(), "Created record");
        Ok(unwrap_record(body, kind))
    }

    /// DELETE /{resource}/{id}
    pub async fn delete(&self, token: &str, kind: ResourceKind, id: i64) -> Result<()> {
        let req = self
            .http
            .delete(self.url(&format!("{}/{}", kind.path(), id)))
            .bearer_auth(token);
        self.send_json(req).await?;
        tracing::info!(resource = kind.key(), id, "Deleted record");
        Ok(())
    }

    /// PATCH /{resource}/{id}/status with `{ "status": ... }`
    pub async fn update_status(
        &self,
        token: &str,
        kind: ResourceKind,
        id: i64,
        status: &str,
    ) -> Result<serde_json::Value> {
        let req = self
            .http
            .patch(self.url(&format!("{}/{}/status", kind.path(), id)))
            .bearer_auth(token)
            .json(&serde_json::json!({ "status": status }));
        let body = self.send_json(req).await?;
        tracing::info!(resource = kind.key(), id, status, "Updated status");
        Ok(unwrap_record(body, kind))
    }

    /// GET /ai/insights/lead-distribution
    pub async fn lead_distribution(&self, token: &str) -> Result<LeadDistribution> {
        let req = self
            .http
            .get(self.url("/ai/insights/lead-distribution"))
            .bearer_auth(token);
        let body = self.send_json(req).await?;
        Ok(serde_json::from_value(body)?)
    }
}

#[async_trait]
impl IdentityProvider for ConsoleClient {
    async fn who_am_i(&self, token: &str) -> Result<Option<User>> {
        let req = self.http.get(self.url("/auth/me")).bearer_auth(token);
        let body = self.send_json(req).await?;
        let parsed: MeResponse = serde_json::from_value(body)?;
        Ok(parsed.user)
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let req = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest { email, password });
        let body = self.send_json(req).await?;
        serde_json::from_value(body)
            .map_err(|e| ConsoleError::InvalidResponse(format!("login response: {}", e)))
    }

    async fn logout(&self, token: &str) -> Result<()> {
        let req = self.http.post(self.url("/auth/logout")).bearer_auth(token);
        self.send_json(req).await?;
        Ok(())
    }
}

fn unwrap_record(body: serde_json::Value, kind: ResourceKind) -> serde_json::Value {
    if let Some(data) = body.get("data").filter(|v| v.is_object()) {
        return data.clone();
    }
    if let Some(record) = body.get(kind.singular()).filter(|v| v.is_object()) {
        return record.clone();
    }
    body
}
