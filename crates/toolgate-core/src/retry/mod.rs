//! Retry engine for outbound calls.
//!
//! Classifies each attempt into an [`ErrorCategory`](toolgate_types::ErrorCategory),
//! retries transient categories with exponential backoff and jitter, honours
//! `Retry-After`, and returns the full attempt trail as a value.

mod backoff;
mod category;
mod engine;
mod result;


pub use backoff::{apply_jitter, calculate_delay, next_delay, parse_retry_after};
pub use category::{
    classify_error, classify_status, FailureKind, OperationError, RetryableResponse,
};
pub use engine::{retry_async, RetryEngine};
pub use result::{RetryAttempt, RetryEvent, RetryResult};
