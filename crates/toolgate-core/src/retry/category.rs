//! Failure taxonomy at the operation boundary.

use thiserror::Error;
use toolgate_types::ErrorCategory;

/// Response-like value returned by a retried operation.
pub trait RetryableResponse {
    fn status_code(&self) -> u16;

    /// Raw `Retry-After` header value, if the response carried one.
    fn retry_after(&self) -> Option<&str> {
        None
    }
}

/// How an operation failed without producing a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused, DNS failure, reset
    Network,
    /// Connect or read timeout
    Timeout,
    Other,
}

/// Error returned by a retried operation instead of a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct OperationError {
    pub kind: FailureKind,
    pub message: String,
}

impl OperationError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }
}

impl From<reqwest::Error> for OperationError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            FailureKind::Timeout
        } else if e.is_connect() || e.is_request() || e.is_body() {
            FailureKind::Network
        } else {
            FailureKind::Other
        };
        Self::new(kind, e.without_url().to_string())
    }
}

/// Category of an HTTP status, or `None` for success (2xx/3xx).
pub fn classify_status(status: u16) -> Option<ErrorCategory> {
    match status {
        200..=399 => None,
        429 => Some(ErrorCategory::RateLimit),
        400..=499 => Some(ErrorCategory::Client),
        500..=599 => Some(ErrorCategory::Server),
        _ => Some(ErrorCategory::Unknown),
    }
}

pub fn classify_error(error: &OperationError) -> ErrorCategory {
    match error.kind {
        FailureKind::Network => ErrorCategory::Network,
        FailureKind::Timeout => ErrorCategory::Timeout,
        FailureKind::Other => ErrorCategory::Unknown,
    }
}
