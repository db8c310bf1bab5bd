//! Mutable per-proxy health state.

use std::time::{Duration, Instant};

/// Outcome of recording an event against a proxy's health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    Unchanged,
    BecameHealthy,
    BecameUnhealthy,
}

/// Health counters for one proxy. Owned by the pool, one per proxy URL.
#[derive(Debug, Clone)]
pub struct ProxyHealth {
    pub is_healthy: bool,
    pub consecutive_failures: u32,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub total_failures: u64,
    pub total_latency_ms: f64,
    pub last_latency_ms: Option<f64>,
    pub last_failure_reason: Option<String>,
    pub last_checked: Option<Instant>,
    pub unhealthy_since: Option<Instant>,
}

impl Default for ProxyHealth {
    fn default() -> Self {
        Self {
            is_healthy: true,
            consecutive_failures: 0,
            total_requests: 0,
            successful_requests: 0,
            total_failures: 0,
            total_latency_ms: 0.0,
            last_latency_ms: None,
            last_failure_reason: None,
            last_checked: None,
            unhealthy_since: None,
        }
    }
}

impl ProxyHealth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean latency of successful requests; `+inf` when there are none.
    pub fn average_latency_ms(&self) -> f64 {
        if self.successful_requests == 0 {
            f64::INFINITY
        } else {
            self.total_latency_ms / self.successful_requests as f64
        }
    }

    /// Fraction of live requests that succeeded; 1.0 when there are none.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            1.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64
        }
    }

    /// Record a successful live request.
    ///
    /// An unhealthy proxy is re-admitted only once `recovery_interval` has
    /// passed since it was marked unhealthy.
    pub fn record_success(
        &mut self,
        latency_ms: f64,
        recovery_interval: Duration,
        now: Instant,
    ) -> HealthTransition {
        let latency_ms = latency_ms.max(0.0);
        self.total_requests += 1;
        self.successful_requests += 1;
        self.total_latency_ms += latency_ms;
        self.last_latency_ms = Some(latency_ms);
        self.consecutive_failures = 0;

        let recovered = self
            .unhealthy_since
            .is_some_and(|since| now.saturating_duration_since(since) >= recovery_interval);
        if !self.is_healthy && recovered {
            self.set_healthy();
            return HealthTransition::BecameHealthy;
        }
        HealthTransition::Unchanged
    }

    /// Record a failed live request.
    pub fn record_failure(&mut self, reason: &str, threshold: u32, now: Instant) -> HealthTransition {
        self.total_requests += 1;
        self.total_failures += 1;
        self.register_failure(reason, threshold, now)
    }

    /// Record a probe outcome. Probes do not count as live requests.
    pub fn record_probe(
        &mut self,
        outcome: Result<(), &str>,
        threshold: u32,
        now: Instant,
    ) -> HealthTransition {
        self.last_checked = Some(now);
        match outcome {
            Ok(()) => {
                self.consecutive_failures = 0;
                if self.is_healthy {
                    HealthTransition::Unchanged
                } else {
                    self.set_healthy();
                    HealthTransition::BecameHealthy
                }
            },
            Err(reason) => self.register_failure(reason, threshold, now),
        }
    }

    fn register_failure(&mut self, reason: &str, threshold: u32, now: Instant) -> HealthTransition {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure_reason = Some(reason.to_string());

        if self.is_healthy && self.consecutive_failures >= threshold {
            self.set_unhealthy(now);
            return HealthTransition::BecameUnhealthy;
        }
        HealthTransition::Unchanged
    }

    pub fn set_healthy(&mut self) {
        self.is_healthy = true;
        self.consecutive_failures = 0;
        self.unhealthy_since = None;
    }

    pub fn set_unhealthy(&mut self, now: Instant) {
        self.is_healthy = false;
        self.unhealthy_since = Some(now);
    }
}
