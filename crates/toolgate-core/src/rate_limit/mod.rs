//! Admission control for outbound calls.
//!
//! Provides per-key rate accounting with:
//! - Token bucket and sliding window primitives
//! - A keyed `RateLimiter` for one identity dimension
//! - A `MultiDimensionRateLimiter` returning the strictest decision
//! - Idle-key sweeping to bound memory
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  MultiDimensionRateLimiter                                   │
//! │  ├── RateLimiter (api_key | ip | user)                       │
//! │  │   └── entries: DashMap<String, KeyState>                  │
//! │  └── RateLimiter (global)                                    │
//! │      └── cleanup_task: background idle sweep                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Checks never block: a denied result carries `retry_after_seconds` and the
//! caller decides whether to wait or reject.

mod identity;
mod limiter;
mod multi;
mod result;
mod sliding_window;
mod token_bucket;


pub use identity::RequestIdentity;
pub use limiter::RateLimiter;
pub use multi::MultiDimensionRateLimiter;
pub use result::{
    RateLimitResult, HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET, HEADER_RETRY_AFTER,
};
pub use sliding_window::SlidingWindowCounter;
pub use token_bucket::TokenBucket;

use std::time::Duration;

pub(crate) fn duration_to_secs_ceil(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

pub(crate) fn secs_f64_ceil(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        secs.ceil() as u64
    } else {
        0
    }
}
