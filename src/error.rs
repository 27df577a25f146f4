//! Error types for backend access and admin services.
//!
//! Errors are classified by recoverability:
//! - Retryable: network failures, 5xx/429 responses, dropped realtime sockets
//! - NonRetryable: bad requests, undecodable rows, illegal admin operations
//! - Configuration: missing/invalid backend URL or key, caught at construction

use thiserror::Error;

use crate::types::IssueStatus;

/// Errors from the hosted backend (row API and change feed).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode {table} row: {source}")]
    Decode {
        table: String,
        source: serde_json::Error,
    },

    #[error("realtime channel error: {0}")]
    Realtime(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl BackendError {
    /// Whether a retry (or reconnect) can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            BackendError::Api { status, .. } => *status == 429 || *status >= 500,
            BackendError::Realtime(_) => true,
            BackendError::Decode { .. } | BackendError::Config(_) => false,
        }
    }
}

/// Errors from admin service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("illegal status transition: {from} -> {to}")]
    IllegalTransition { from: IssueStatus, to: IssueStatus },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_retryability_by_status() {
        let rate_limited = BackendError::Api {
            status: 429,
            body: String::new(),
        };
        let server_error = BackendError::Api {
            status: 503,
            body: String::new(),
        };
        let bad_request = BackendError::Api {
            status: 400,
            body: "malformed filter".into(),
        };
        assert!(rate_limited.is_retryable());
        assert!(server_error.is_retryable());
        assert!(!bad_request.is_retryable());
    }

    #[test]
    fn test_config_and_decode_are_not_retryable() {
        let config = BackendError::Config("missing key".into());
        assert!(!config.is_retryable());

        let decode = BackendError::Decode {
            table: "tasks".into(),
            source: serde_json::from_str::<i32>("not json").unwrap_err(),
        };
        assert!(!decode.is_retryable());
    }
}
