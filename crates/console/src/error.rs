//! Console error types.

use thiserror::Error;

/// Errors surfaced by the backend client and the session flows.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Token missing, invalid or expired (HTTP 401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (HTTP 403, or a local role check).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Backend answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Request never completed (connect, timeout, TLS).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body was not the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),
}

impl ConsoleError {
    /// Authentication failures clear the session and send the user to login.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ConsoleError::Unauthorized(_))
    }

    /// Authorization failures redirect to the fallback route.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, ConsoleError::Forbidden(_))
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ConsoleError::InvalidResponse(e.to_string())
        } else {
            ConsoleError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(e: serde_json::Error) -> Self {
        ConsoleError::Json(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
