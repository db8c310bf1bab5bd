//! Egress-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can stop an outbound call before or while it is sent.
///
/// Exhausted retries are not represented here: the retry engine returns its
/// attempt trail as a value and the caller decides how to surface it.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum EgressError {
    /// Admission control denied the call
    #[error("Rate limited on {dimension}{}", retry_after_secs.map(|s| format!(", retry after {}s", s)).unwrap_or_default())]
    RateLimited { dimension: String, retry_after_secs: Option<u64> },

    /// Every proxy in the pool is unhealthy or excluded for this domain
    #[error("No egress available{}", domain.as_ref().map(|d| format!(" for {}", d)).unwrap_or_default())]
    NoEgressAvailable { domain: Option<String> },

    /// Proxy URL could not be parsed or turned into a client
    #[error("Invalid proxy {url}: {message}")]
    InvalidProxy { url: String, message: String },

    /// Request descriptor is malformed (bad URL, unknown method)
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Overall deadline for the call elapsed
    #[error("Request timeout after {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// Upstream request could not be built or sent
    #[error("Upstream error: {message}")]
    Upstream { message: String },

    /// Internal error (bugs, unexpected states)
    #[error("Internal egress error: {message}")]
    Internal { message: String },
}

impl EgressError {
    /// Check if this is a client error (4xx equivalent).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::InvalidProxy { .. } | Self::InvalidRequest { .. }
        )
    }

    /// Get HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::RateLimited { .. } => 429,
            Self::InvalidProxy { .. } | Self::InvalidRequest { .. } => 400,
            Self::NoEgressAvailable { .. } => 503,
            Self::Timeout { .. } => 504,
            Self::Upstream { .. } => 502,
            Self::Internal { .. } => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            EgressError::RateLimited { dimension: "ip".to_string(), retry_after_secs: None }
                .http_status_code(),
            429
        );
        assert_eq!(EgressError::NoEgressAvailable { domain: None }.http_status_code(), 503);
        assert_eq!(EgressError::Timeout { duration_secs: 30 }.http_status_code(), 504);
    }

    #[test]
    fn test_no_egress_display() {
        let with_domain = EgressError::NoEgressAvailable { domain: Some("a.com".to_string()) };
        assert_eq!(with_domain.to_string(), "No egress available for a.com");

        let without = EgressError::NoEgressAvailable { domain: None };
        assert_eq!(without.to_string(), "No egress available");
    }

    #[test]
    fn test_is_client_error() {
        let limited =
            EgressError::RateLimited { dimension: "global".to_string(), retry_after_secs: Some(1) };
        let upstream = EgressError::Upstream { message: "boom".to_string() };

        assert!(limited.is_client_error());
        assert!(!upstream.is_client_error());
    }
}
