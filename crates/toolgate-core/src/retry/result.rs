//! Attempt trail produced by the retry engine.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use toolgate_types::ErrorCategory;

/// One try of the operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryAttempt {
    /// 1-based sequence number
    pub attempt_number: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
    /// `None` on success
    pub category: Option<ErrorCategory>,
    pub message: Option<String>,
    pub status_code: Option<u16>,
    /// Delay waited before this attempt started
    pub delay_before_ms: u64,
}

/// Passed to the `on_retry` callback once per failed attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryEvent<'a> {
    pub attempt: &'a RetryAttempt,
    /// Delay before the next attempt, `None` when no retry follows
    pub next_delay: Option<Duration>,
}

/// Outcome of a retried operation. Returned even when every attempt failed.
#[derive(Debug, Clone)]
pub struct RetryResult<R> {
    pub attempts: Vec<RetryAttempt>,
    pub success: bool,
    /// Last response received, successful or not
    pub response: Option<R>,
    /// Message of the final failure
    pub error: Option<String>,
    pub total_duration_ms: u64,
    /// The overall deadline cut the loop short
    pub timed_out: bool,
}

impl<R> RetryResult<R> {
    pub fn total_attempts(&self) -> usize {
        self.attempts.len()
    }

    pub fn retries_count(&self) -> usize {
        self.attempts.len().saturating_sub(1)
    }

    pub fn last_attempt(&self) -> Option<&RetryAttempt> {
        self.attempts.last()
    }

    pub fn final_status_code(&self) -> Option<u16> {
        self.last_attempt().and_then(|a| a.status_code)
    }

    pub fn final_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn final_category(&self) -> Option<ErrorCategory> {
        self.last_attempt().and_then(|a| a.category)
    }

    /// Keep the trail, transform the response.
    pub fn map_response<T>(self, f: impl FnOnce(R) -> T) -> RetryResult<T> {
        RetryResult {
            attempts: self.attempts,
            success: self.success,
            response: self.response.map(f),
            error: self.error,
            total_duration_ms: self.total_duration_ms,
            timed_out: self.timed_out,
        }
    }
}
