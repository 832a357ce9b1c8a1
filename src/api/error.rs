// Allow dead code: classification helpers for callers that retry
#![allow(dead_code)]

use serde::Deserialize;
use thiserror::Error;

use super::transport::TransportError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Unauthorized - token was rejected")]
    Unauthorized,

    /// Terminal session failure. Every unrecoverable auth path collapses to
    /// this one shape so callers render a single "please log in again"
    /// treatment without re-deriving the classification.
    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Structured error body the service returns on failures.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "exceptionKind")]
    pub exception_kind: Option<String>,
}

impl ErrorBody {
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = ErrorBody::parse(body)
            .map(|b| b.message)
            .unwrap_or_else(|| Self::truncate_body(body));
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(detail),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, detail)),
        }
    }

    /// True when the only remedy is logging in again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    /// True for failures worth retrying as-is (connectivity, rate limits).
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::RateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_body_message_is_used() {
        let body = r#"{"message":"Card is blocked","exceptionKind":"CardBlocked"}"#;
        match ApiError::from_status(403, body) {
            ApiError::AccessDenied(msg) => assert_eq!(msg, "Card is blocked"),
            other => panic!("expected AccessDenied, got {:?}", other),
        }
    }

    #[test]
    fn unstructured_body_is_truncated() {
        let body = "x".repeat(600);
        match ApiError::from_status(500, &body) {
            ApiError::ServerError(msg) => {
                assert!(msg.contains("truncated"));
                assert!(msg.len() < 600);
            }
            other => panic!("expected ServerError, got {:?}", other),
        }
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(ApiError::from_status(401, ""), ApiError::Unauthorized));
        assert!(matches!(ApiError::from_status(404, "missing"), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(429, ""), ApiError::RateLimited));
        assert!(matches!(ApiError::from_status(418, ""), ApiError::InvalidResponse(_)));
    }

    #[test]
    fn terminal_and_transient_split() {
        assert!(ApiError::SessionExpired.is_terminal());
        assert!(!ApiError::SessionExpired.is_transient());
        assert!(ApiError::Network(TransportError::Timeout).is_transient());
        assert!(!ApiError::AccessDenied("nope".to_string()).is_terminal());
    }
}
