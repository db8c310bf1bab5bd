//! Pool statistics snapshots for monitoring.

use std::collections::BTreeSet;

use serde::Serialize;
use toolgate_types::{ProxyProtocol, SelectorKind};

/// Point-in-time view of the whole pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatistics {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub selector: SelectorKind,
    pub health_check_running: bool,
    pub proxies: Vec<ProxyStatsEntry>,
}

/// Per-proxy view. The URL is always redacted.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyStatsEntry {
    pub url: String,
    pub protocol: ProxyProtocol,
    pub is_healthy: bool,
    pub consecutive_failures: u32,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub total_failures: u64,
    pub success_rate: f64,
    /// `None` until the proxy has served a successful request
    pub average_latency_ms: Option<f64>,
    pub last_latency_ms: Option<f64>,
    pub last_failure_reason: Option<String>,
    pub seconds_since_check: Option<u64>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub allowed_domains: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub denied_domains: BTreeSet<String>,
}
