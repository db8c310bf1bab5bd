use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use toolgate_types::{ConfigError, EgressError, ProxyPoolSettings, SelectorKind};

use super::checker::{HealthProbe, HttpHealthProbe};
use super::config::{parse_proxy_list, parse_proxy_url, ProxyConfig};
use super::health::{HealthTransition, ProxyHealth};
use super::selector::{selector_for, Candidate, ProxySelector};
use super::stats::{PoolStatistics, ProxyStatsEntry};
use crate::error::AppResult;
use crate::metrics;

struct HealthCheckTask {
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Set of egress proxies with health tracking and a pluggable selector.
///
/// Proxies keep insertion order. Health state lives in a `DashMap` keyed by
/// canonical proxy URL; no lock is held across a probe.
pub struct ProxyPool {
    settings: ProxyPoolSettings,
    proxies: RwLock<Vec<(String, Arc<ProxyConfig>)>>,
    health: DashMap<String, ProxyHealth>,
    selector: Box<dyn ProxySelector>,
    probe: Arc<dyn HealthProbe>,
    health_task: Mutex<Option<HealthCheckTask>>,
}

impl ProxyPool {
    /// Build a pool from settings, probing with [`HttpHealthProbe`].
    pub fn new(settings: ProxyPoolSettings) -> AppResult<Self> {
        let probe = Arc::new(HttpHealthProbe::new()?);
        Ok(Self::with_probe(settings, probe)?)
    }

    pub fn with_probe(
        settings: ProxyPoolSettings,
        probe: Arc<dyn HealthProbe>,
    ) -> Result<Self, ConfigError> {
        settings.validate_config()?;

        let pool = Self {
            selector: selector_for(settings.selector),
            settings,
            proxies: RwLock::new(Vec::new()),
            health: DashMap::new(),
            probe,
            health_task: Mutex::new(None),
        };
        for config in parse_proxy_list(&pool.settings.proxy_list) {
            pool.add_proxy(config);
        }

        tracing::info!(
            pool_size = pool.len(),
            selector = %pool.settings.selector,
            threshold = pool.settings.unhealthy_threshold,
            "ProxyPool initialized"
        );
        Ok(pool)
    }

    pub const fn settings(&self) -> &ProxyPoolSettings {
        &self.settings
    }

    pub fn selector_kind(&self) -> SelectorKind {
        self.selector.kind()
    }

    pub fn len(&self) -> usize {
        self.proxies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.read().is_empty()
    }

    /// Add a proxy in healthy state. Returns false if it is already present.
    pub fn add_proxy(&self, config: ProxyConfig) -> bool {
        let key = config.url();
        let mut proxies = self.proxies.write();
        if proxies.iter().any(|(k, _)| *k == key) {
            return false;
        }
        self.health.insert(key.clone(), ProxyHealth::new());
        tracing::info!(proxy = %config.redacted_url(), "Proxy added to pool");
        proxies.push((key, Arc::new(config)));
        true
    }

    /// Parse and add a proxy URL in any supported form.
    pub fn add_proxy_url(&self, raw: &str) -> Result<bool, EgressError> {
        Ok(self.add_proxy(parse_proxy_url(raw)?))
    }

    /// Remove a proxy by URL (any supported form). Returns false if unknown.
    pub async fn remove_proxy(&self, url: &str) -> bool {
        let key = self.resolve_key(url);
        let removed = {
            let mut proxies = self.proxies.write();
            let before = proxies.len();
            proxies.retain(|(k, _)| *k != key);
            before != proxies.len()
        };
        if !removed {
            return false;
        }
        self.health.remove(&key);
        self.probe.forget(&key).await;
        tracing::info!(proxy = %super::redact_proxy_url(&key), "Proxy removed from pool");
        true
    }

    /// Select a healthy proxy allowed to serve `domain`. `None` skips domain
    /// filtering.
    pub fn get_proxy(&self, domain: Option<&str>) -> Option<Arc<ProxyConfig>> {
        let proxies = self.proxies.read();
        let mut eligible: Vec<(&Arc<ProxyConfig>, f64)> = Vec::with_capacity(proxies.len());
        let mut keys: Vec<&str> = Vec::with_capacity(proxies.len());
        for (key, config) in proxies.iter() {
            if domain.is_some_and(|d| !config.matches_domain(d)) {
                continue;
            }
            let Some(health) = self.health.get(key) else {
                continue;
            };
            if health.is_healthy {
                eligible.push((config, health.average_latency_ms()));
                keys.push(key.as_str());
            }
        }

        let candidates: Vec<Candidate<'_>> = keys
            .iter()
            .zip(&eligible)
            .map(|(url, (_, latency))| Candidate { url: *url, average_latency_ms: *latency })
            .collect();

        let selected = self
            .selector
            .select(&candidates)
            .and_then(|idx| eligible.get(idx))
            .map(|(config, _)| Arc::clone(config));

        match selected {
            Some(selected) => {
                tracing::debug!(
                    proxy = %selected.redacted_url(),
                    selector = %self.selector.kind(),
                    candidates = candidates.len(),
                    domain = domain.unwrap_or("*"),
                    "Selected proxy"
                );
                Some(selected)
            },
            None => {
                tracing::debug!(
                    domain = domain.unwrap_or("*"),
                    total = proxies.len(),
                    "No healthy proxy available"
                );
                None
            },
        }
    }

    /// Select a proxy for the host of `url`. Returns `None` for URLs without a host.
    pub fn get_proxy_for_url(&self, url: &str) -> Option<Arc<ProxyConfig>> {
        let parsed = url::Url::parse(url).ok()?;
        self.get_proxy(Some(parsed.host_str()?))
    }

    /// Record a successful live request through `proxy_url`.
    pub fn report_success(&self, proxy_url: &str, latency_ms: f64) {
        let recovery = Duration::from_secs(self.settings.recovery_interval_seconds);
        let key = self.resolve_key(proxy_url);
        let transition = match self.health.get_mut(&key) {
            Some(mut health) => health.record_success(latency_ms, recovery, Instant::now()),
            None => {
                tracing::debug!(proxy = %super::redact_proxy_url(&key), "Success reported for unknown proxy");
                return;
            },
        };
        self.log_transition(&key, transition, None);
    }

    /// Record a failed live request through `proxy_url`.
    pub fn report_failure(&self, proxy_url: &str, reason: &str) {
        let key = self.resolve_key(proxy_url);
        let transition = match self.health.get_mut(&key) {
            Some(mut health) => {
                health.record_failure(reason, self.settings.unhealthy_threshold, Instant::now())
            },
            None => {
                tracing::debug!(proxy = %super::redact_proxy_url(&key), "Failure reported for unknown proxy");
                return;
            },
        };
        self.log_transition(&key, transition, Some(reason));
    }

    /// Force a proxy back into rotation.
    pub fn mark_healthy(&self, proxy_url: &str) -> bool {
        let key = self.resolve_key(proxy_url);
        let transition = match self.health.get_mut(&key) {
            Some(mut health) if !health.is_healthy => {
                health.set_healthy();
                HealthTransition::BecameHealthy
            },
            Some(_) => HealthTransition::Unchanged,
            None => return false,
        };
        self.log_transition(&key, transition, Some("manual override"));
        true
    }

    /// Force a proxy out of rotation until it recovers.
    pub fn mark_unhealthy(&self, proxy_url: &str) -> bool {
        let key = self.resolve_key(proxy_url);
        let transition = match self.health.get_mut(&key) {
            Some(mut health) if health.is_healthy => {
                health.set_unhealthy(Instant::now());
                HealthTransition::BecameUnhealthy
            },
            Some(_) => HealthTransition::Unchanged,
            None => return false,
        };
        self.log_transition(&key, transition, Some("manual override"));
        true
    }

    /// Snapshot of one proxy's health.
    pub fn health_of(&self, proxy_url: &str) -> Option<ProxyHealth> {
        self.health.get(&self.resolve_key(proxy_url)).map(|h| h.clone())
    }

    /// Stored key for `proxy_url`: the exact string when it is a pool key,
    /// otherwise its canonical form.
    fn resolve_key(&self, proxy_url: &str) -> String {
        let trimmed = proxy_url.trim();
        if self.health.contains_key(trimmed) {
            trimmed.to_string()
        } else {
            canonical_key(trimmed)
        }
    }

    fn log_transition(&self, key: &str, transition: HealthTransition, reason: Option<&str>) {
        match transition {
            HealthTransition::Unchanged => {},
            HealthTransition::BecameHealthy => {
                metrics::record_proxy_health_transition(true);
                tracing::info!(proxy = %super::redact_proxy_url(key), "Proxy recovered, back in rotation");
            },
            HealthTransition::BecameUnhealthy => {
                metrics::record_proxy_health_transition(false);
                tracing::warn!(
                    proxy = %super::redact_proxy_url(key),
                    reason = reason.unwrap_or("unknown"),
                    "Proxy marked unhealthy, excluded from selection"
                );
            },
        }
    }

    /// Probe every proxy once, concurrently. Returns the number of successful probes.
    pub async fn run_health_check_once(&self) -> usize {
        let proxies: Vec<(String, Arc<ProxyConfig>)> = self.proxies.read().clone();
        let timeout = Duration::from_secs(self.settings.health_check_timeout_seconds);
        let url = self.settings.health_check_url.as_str();

        let outcomes = futures::future::join_all(proxies.iter().map(|(key, config)| async move {
            let outcome = match tokio::time::timeout(timeout, self.probe.probe(config, url, timeout)).await {
                Ok(result) => result,
                Err(_) => Err("probe timed out".to_string()),
            };
            (key.as_str(), outcome)
        }))
        .await;

        let now = Instant::now();
        let mut successes = 0;
        for (key, outcome) in outcomes {
            if outcome.is_ok() {
                successes += 1;
            }
            let probe_result = outcome.as_ref().map(|_| ()).map_err(String::as_str);
            let transition = match self.health.get_mut(key) {
                Some(mut health) => {
                    health.record_probe(probe_result, self.settings.unhealthy_threshold, now)
                },
                // Removed while the probe was in flight
                None => continue,
            };
            if let Err(reason) = &outcome {
                tracing::debug!(proxy = %super::redact_proxy_url(key), error = %reason, "Health probe failed");
            }
            self.log_transition(key, transition, probe_result.err());
        }

        tracing::debug!(total = proxies.len(), healthy_probes = successes, "Health check cycle complete");
        successes
    }

    /// Start the periodic health-check loop. Returns false if it is already running.
    ///
    /// The first cycle runs immediately.
    pub fn start_health_check(self: &Arc<Self>) -> bool {
        let mut slot = self.health_task.lock();
        if slot.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return false;
        }

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
        let pool: Weak<Self> = Arc::downgrade(self);
        let period = Duration::from_secs(self.settings.health_check_interval_seconds);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(pool) = pool.upgrade() else { break };
                        pool.run_health_check_once().await;
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Proxy health check loop shutting down");
                        break;
                    }
                }
            }
        });

        tracing::info!(interval_secs = period.as_secs(), "Proxy health check loop started");
        *slot = Some(HealthCheckTask { shutdown_tx, handle });
        true
    }

    /// Signal the health-check loop and wait for it to finish. No-op if not running.
    pub async fn stop_health_check(&self) {
        let task = self.health_task.lock().take();
        if let Some(task) = task {
            let _ = task.shutdown_tx.send(true);
            if let Err(e) = task.handle.await {
                tracing::warn!("Health check task ended abnormally: {}", e);
            }
        }
    }

    pub fn is_health_check_running(&self) -> bool {
        self.health_task.lock().as_ref().is_some_and(|t| !t.handle.is_finished())
    }

    pub fn get_statistics(&self) -> PoolStatistics {
        let now = Instant::now();
        let proxies = self.proxies.read();

        let entries: Vec<ProxyStatsEntry> = proxies
            .iter()
            .filter_map(|(key, config)| {
                let health = self.health.get(key)?;
                let average = health.average_latency_ms();
                Some(ProxyStatsEntry {
                    url: config.redacted_url(),
                    protocol: config.protocol,
                    is_healthy: health.is_healthy,
                    consecutive_failures: health.consecutive_failures,
                    total_requests: health.total_requests,
                    successful_requests: health.successful_requests,
                    total_failures: health.total_failures,
                    success_rate: health.success_rate(),
                    average_latency_ms: average.is_finite().then_some(average),
                    last_latency_ms: health.last_latency_ms,
                    last_failure_reason: health.last_failure_reason.clone(),
                    seconds_since_check: health
                        .last_checked
                        .map(|t| now.saturating_duration_since(t).as_secs()),
                    allowed_domains: config.allowed_domains.clone(),
                    denied_domains: config.denied_domains.clone(),
                })
            })
            .collect();

        let healthy = entries.iter().filter(|e| e.is_healthy).count();
        PoolStatistics {
            total: entries.len(),
            healthy,
            unhealthy: entries.len() - healthy,
            selector: self.selector.kind(),
            health_check_running: self.is_health_check_running(),
            proxies: entries,
        }
    }
}

impl Drop for ProxyPool {
    fn drop(&mut self) {
        if let Some(task) = self.health_task.get_mut().take() {
            let _ = task.shutdown_tx.send(true);
        }
    }
}

impl std::fmt::Debug for ProxyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyPool")
            .field("size", &self.len())
            .field("selector", &self.selector.kind())
            .finish_non_exhaustive()
    }
}

/// Canonical pool key for any supported proxy URL form.
fn canonical_key(url: &str) -> String {
    parse_proxy_url(url).map(|c| c.url()).unwrap_or_else(|_| url.trim().to_string())
}
