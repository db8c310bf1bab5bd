//! # Toolgate Core
//!
//! Outbound resilience layer for the Toolgate tool-execution gateway.
//!
//! ## Architecture
//!
//! ```text
//! toolgate-core/src/
//! ├── rate_limit/   # token bucket, sliding window, keyed + multi-dimension limiters
//! ├── proxy_pool/   # proxy parsing, selectors, health tracking, probe loop
//! ├── retry/        # classification, backoff + jitter, retry engine
//! ├── pipeline.rs   # admission → egress selection → retry loop
//! ├── audit.rs      # JSON audit records of attempt trails
//! ├── http.rs       # request descriptors and per-proxy client cache
//! ├── middleware/   # axum admission middleware for inbound requests
//! └── metrics.rs    # Prometheus counters
//! ```
//!
//! The three components are independent; `EgressPipeline` is the only place
//! that wires them together.

#![allow(
    clippy::significant_drop_tightening,
    reason = "RwLock guards in async code require careful lifetime management"
)]
#![allow(clippy::map_err_ignore, reason = "Error context is provided in the replacement message")]
#![allow(
    clippy::derive_partial_eq_without_eq,
    reason = "Some types intentionally don't implement Eq"
)]
// Test-only lints: allow panic!, println!, etc. in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::float_cmp,
        clippy::unwrap_used,
        clippy::assertions_on_result_states
    )
)]

pub mod audit;
pub mod error;
pub mod http;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod proxy_pool;
pub mod rate_limit;
pub mod retry;

// Re-export commonly used types
pub use audit::{create_audit_record, AuditRecord};
pub use error::{AppError, AppResult};
pub use http::{HttpResponse, OutboundRequest};
pub use pipeline::{EgressPipeline, PipelineOutcome};
pub use proxy_pool::{parse_proxy_list, parse_proxy_url, ProxyConfig, ProxyPool};
pub use rate_limit::{MultiDimensionRateLimiter, RateLimitResult, RateLimiter, RequestIdentity};
pub use retry::{RetryEngine, RetryResult};
