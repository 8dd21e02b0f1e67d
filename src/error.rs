// Service-level errors surfaced to the presentation layer
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::auth::AuthError;
use crate::database::manager::DatabaseError;
use crate::filter::FilterError;

/// Failure categories callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    Unauthorized,
    Upstream,
    Inconsistent,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Upstream store failure: {0}")]
    Upstream(#[from] DatabaseError),

    #[error("Inconsistent reference data: {0}")]
    Inconsistent(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl StatsError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        StatsError::Unauthenticated(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        StatsError::Unauthorized(message.into())
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        StatsError::Inconsistent(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StatsError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            StatsError::Unauthorized(_) => ErrorKind::Unauthorized,
            StatsError::Upstream(_) => ErrorKind::Upstream,
            StatsError::Inconsistent(_) => ErrorKind::Inconsistent,
            StatsError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Suggested HTTP status for hosts that expose these operations over HTTP
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Unauthenticated => 401,
            ErrorKind::Unauthorized => 403,
            ErrorKind::Upstream => 502,
            ErrorKind::Inconsistent => 500,
            ErrorKind::Cancelled => 499,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Unauthenticated => "UNAUTHENTICATED",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Upstream => "UPSTREAM_ERROR",
            ErrorKind::Inconsistent => "INCONSISTENT_DATA",
            ErrorKind::Cancelled => "CANCELLED",
        }
    }

    /// Client-safe body; store internals are logged, not returned
    pub fn to_json(&self) -> Value {
        let message = match self {
            StatsError::Upstream(err) => {
                tracing::error!("Upstream store error: {}", err);
                "The data store could not complete the request".to_string()
            }
            other => other.to_string(),
        };
        json!({
            "error": true,
            "message": message,
            "code": self.error_code()
        })
    }
}

impl From<FilterError> for StatsError {
    fn from(err: FilterError) -> Self {
        StatsError::Upstream(DatabaseError::from(err))
    }
}

impl From<AuthError> for StatsError {
    fn from(err: AuthError) -> Self {
        StatsError::Unauthenticated(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_are_upstream_and_hidden() {
        let err = StatsError::from(DatabaseError::Unavailable("pg down at 10.0.0.4".into()));
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.status_code(), 502);
        let body = err.to_json();
        assert_eq!(body["code"], "UPSTREAM_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("10.0.0.4"));
    }

    #[test]
    fn filter_errors_map_to_upstream() {
        let err = StatsError::from(FilterError::InvalidColumn("x".into()));
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }

    #[test]
    fn auth_errors_map_to_unauthenticated() {
        let err = StatsError::from(AuthError::MissingHeader);
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        assert_eq!(err.to_json()["code"], "UNAUTHENTICATED");
    }
}
