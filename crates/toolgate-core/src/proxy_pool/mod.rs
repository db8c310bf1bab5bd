//! Egress proxy pool with health management.
//!
//! Provides:
//! - Proxy URL parsing (`scheme://[user:pass@]host:port`, `host:port`, `host:port:user:pass`)
//! - Per-proxy domain allow/deny lists with suffix matching
//! - Round-robin, latency-based and random selection over healthy proxies
//! - Consecutive-failure tracking with automatic exclusion
//! - A background health-check loop that re-admits recovered proxies
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ProxyPool                                                   │
//! │  ├── proxies: RwLock<Vec<(url, ProxyConfig)>>  (insertion)   │
//! │  ├── health: DashMap<url, ProxyHealth>                       │
//! │  ├── selector: Box<dyn ProxySelector>                        │
//! │  └── health_task: periodic HealthProbe over every proxy      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Proxy credentials never reach logs: everything logged goes through
//! [`redact_proxy_url`] or [`ProxyConfig::redacted_url`].

mod checker;
mod config;
mod health;
mod pool;
mod selector;
mod stats;

#[cfg(test)]
mod tests;

pub use checker::{HealthProbe, HttpHealthProbe};
pub use config::{parse_proxy_list, parse_proxy_url, redact_proxy_url, ProxyConfig};
pub use health::{HealthTransition, ProxyHealth};
pub use pool::ProxyPool;
pub use selector::{
    selector_for, Candidate, LatencyBasedSelector, ProxySelector, RandomSelector,
    RoundRobinSelector,
};
pub use stats::{PoolStatistics, ProxyStatsEntry};
