//! Admission decision returned by every limiter.

use serde::Serialize;
use toolgate_types::RateLimitDimension;

use super::secs_f64_ceil;

pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RESET: &str = "X-RateLimit-Reset";
pub const HEADER_RETRY_AFTER: &str = "Retry-After";

/// Outcome of a single admission check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Whole permits left after this check
    pub remaining: u64,
    /// Configured capacity (bucket size or window maximum)
    pub limit: u64,
    /// Seconds until the key is back at full capacity / the oldest slot frees
    pub reset_after_seconds: f64,
    /// Seconds until the next permit, present only when denied
    pub retry_after_seconds: Option<f64>,
    /// Dimension of the limiter that produced this result
    pub dimension: Option<RateLimitDimension>,
}

impl RateLimitResult {
    pub const fn allow(remaining: u64, limit: u64, reset_after_seconds: f64) -> Self {
        Self {
            allowed: true,
            remaining,
            limit,
            reset_after_seconds,
            retry_after_seconds: None,
            dimension: None,
        }
    }

    pub const fn deny(retry_after_seconds: f64, limit: u64, reset_after_seconds: f64) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            limit,
            reset_after_seconds,
            retry_after_seconds: Some(retry_after_seconds),
            dimension: None,
        }
    }

    /// Result used when no limiter is configured.
    pub const fn unlimited() -> Self {
        Self::allow(u64::MAX, u64::MAX, 0.0)
    }

    pub const fn with_dimension(mut self, dimension: RateLimitDimension) -> Self {
        self.dimension = Some(dimension);
        self
    }

    /// Whole seconds a denied caller should wait (rounded up, at least 1).
    pub fn retry_after_secs_ceil(&self) -> Option<u64> {
        self.retry_after_seconds.map(|s| secs_f64_ceil(s).max(1))
    }

    /// Headers for the HTTP layer. `Retry-After` is only present when denied.
    pub fn to_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::with_capacity(4);
        if self.limit != u64::MAX {
            headers.push((HEADER_LIMIT, self.limit.to_string()));
            headers.push((HEADER_REMAINING, self.remaining.to_string()));
        }
        headers.push((HEADER_RESET, secs_f64_ceil(self.reset_after_seconds).to_string()));
        if let Some(retry_after) = self.retry_after_secs_ceil() {
            headers.push((HEADER_RETRY_AFTER, retry_after.to_string()));
        }
        headers
    }
}
