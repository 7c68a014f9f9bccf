//! Logging helpers for results whose failure is handled locally.
//!
//! Most console failures degrade to a navigable state instead of bubbling up
//! (logout still clears the session, a failed fetch becomes an inline error).
//! These helpers make sure the degraded path still leaves a trace.

use std::fmt::Display;

/// Extension trait for logging errors with the caller's location.
pub trait ResultExt<T, E> {
    /// Log the error at `error` level and return the result unchanged.
    fn log<S: ToString>(self, context: S) -> Result<T, E>;

    /// Log the error at `warn` level and discard it.
    ///
    /// Used for best-effort calls whose failure must not stop the flow,
    /// e.g. the backend logout before the local session is cleared.
    fn best_effort<S: ToString>(self, context: S) -> Option<T>;
}

impl<T, E: Display> ResultExt<T, E> for Result<T, E> {
    #[track_caller]
    fn log<S: ToString>(self, context: S) -> Result<T, E> {
        if let Err(ref e) = self {
            let caller = std::panic::Location::caller();
            tracing::error!(
                target: "crm_console",
                error = %e,
                file = %format!("{}:{}", caller.file(), caller.line()),
                context = %context.to_string(),
                "Operation failed"
            );
        }
        self
    }

    #[track_caller]
    fn best_effort<S: ToString>(self, context: S) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                let caller = std::panic::Location::caller();
                tracing::warn!(
                    target: "crm_console",
                    error = %e,
                    file = %format!("{}:{}", caller.file(), caller.line()),
                    context = %context.to_string(),
                    "Ignoring failure"
                );
                None
            }
        }
    }
}

/// Extension trait for logging a missing value.
pub trait OptionResultExt<T> {
    /// Log at `warn` level if this is `None`.
    fn log_none<S: ToString>(self, context: S) -> Option<T>;
}

impl<T> OptionResultExt<T> for Option<T> {
    #[track_caller]
    fn log_none<S: ToString>(self, context: S) -> Option<T> {
        if self.is_none() {
            let caller = std::panic::Location::caller();
            tracing::warn!(
                target: "crm_console",
                file = %format!("{}:{}", caller.file(), caller.line()),
                context = %context.to_string(),
                "Expected value was None"
            );
        }
        self
    }
}
