//! Keyed rate limiter for a single identity dimension.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use toolgate_types::{ConfigError, RateLimitAlgorithm, RateLimitConfig, RateLimitDimension};

use super::identity::RequestIdentity;
use super::result::RateLimitResult;
use super::sliding_window::SlidingWindowCounter;
use super::token_bucket::TokenBucket;
use crate::metrics;

/// Per-key accounting state.
#[derive(Debug)]
enum Accounting {
    Bucket(TokenBucket),
    Window(SlidingWindowCounter),
}

#[derive(Debug)]
struct KeyState {
    accounting: Accounting,
    last_seen: Instant,
}

impl KeyState {
    fn new(config: &RateLimitConfig, now: Instant) -> Self {
        let accounting = match config.algorithm {
            RateLimitAlgorithm::TokenBucket => Accounting::Bucket(TokenBucket::with_instant(
                config.burst_size,
                config.requests_per_second,
                now,
            )),
            RateLimitAlgorithm::SlidingWindow => Accounting::Window(SlidingWindowCounter::new(
                Duration::from_secs(config.window_size_seconds),
                config.window_max_requests(),
            )),
        };
        Self { accounting, last_seen: now }
    }

    fn try_acquire(&mut self, now: Instant) -> RateLimitResult {
        if now > self.last_seen {
            self.last_seen = now;
        }
        match &mut self.accounting {
            Accounting::Bucket(bucket) => bucket.try_acquire(now),
            Accounting::Window(window) => window.try_acquire(now),
        }
    }

    fn refund(&mut self) {
        match &mut self.accounting {
            Accounting::Bucket(bucket) => bucket.refund(),
            Accounting::Window(window) => window.refund(),
        }
    }
}

/// Rate limiter that keeps one bucket or window per resolved key.
///
/// Per-key state lives in a sharded `DashMap`; a check holds only the
/// shard guard for its own key, so distinct keys never serialize.
pub struct RateLimiter {
    config: RateLimitConfig,
    entries: DashMap<String, KeyState>,
    idle_timeout: Duration,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
}

impl RateLimiter {
    /// Default time after which an untouched key is dropped.
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

    pub fn new(config: RateLimitConfig) -> Result<Self, ConfigError> {
        Self::with_idle_timeout(config, Self::DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(
        config: RateLimitConfig,
        idle_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        config.validate_config()?;
        let (shutdown_tx, _) = tokio::sync::watch::channel(false);
        Ok(Self { config, entries: DashMap::new(), idle_timeout, shutdown_tx })
    }

    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub const fn dimension(&self) -> RateLimitDimension {
        self.config.dimension
    }

    /// Check and consume one permit for the caller.
    pub fn check(&self, identity: &RequestIdentity) -> RateLimitResult {
        self.check_key_at(&identity.rate_limit_key(self.config.dimension), Instant::now())
    }

    pub fn check_at(&self, identity: &RequestIdentity, now: Instant) -> RateLimitResult {
        self.check_key_at(&identity.rate_limit_key(self.config.dimension), now)
    }

    /// Check and consume one permit for an already resolved key.
    pub fn check_key(&self, key: &str) -> RateLimitResult {
        self.check_key_at(key, Instant::now())
    }

    pub fn check_key_at(&self, key: &str, now: Instant) -> RateLimitResult {
        let result = {
            let mut state = self
                .entries
                .entry(key.to_string())
                .or_insert_with(|| KeyState::new(&self.config, now));
            state.try_acquire(now)
        }
        .with_dimension(self.config.dimension);

        metrics::record_rate_limit_decision(self.config.dimension, result.allowed);
        if !result.allowed {
            tracing::debug!(
                key = %key,
                dimension = %self.config.dimension,
                retry_after = ?result.retry_after_seconds,
                "Rate limit exceeded"
            );
        }
        result
    }

    /// Give back a permit consumed by an earlier check for the caller.
    pub fn refund(&self, identity: &RequestIdentity) {
        self.refund_key(&identity.rate_limit_key(self.config.dimension));
    }

    pub fn refund_key(&self, key: &str) {
        if let Some(mut state) = self.entries.get_mut(key) {
            state.refund();
        }
    }

    /// Drop keys untouched for longer than the idle timeout. Returns the count removed.
    pub fn cleanup_idle(&self) -> usize {
        self.cleanup_idle_at(Instant::now())
    }

    pub fn cleanup_idle_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, state| now.saturating_duration_since(state.last_seen) < self.idle_timeout);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(
                dimension = %self.config.dimension,
                removed,
                "Swept idle rate limit keys"
            );
        }
        removed
    }

    /// Spawn the periodic idle sweep. Stops on `shutdown()` or when the last
    /// `Arc` is dropped; exits at once if `shutdown()` was already called.
    pub fn start_cleanup_task(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let limiter: Weak<Self> = Arc::downgrade(self);
        let dimension = self.config.dimension;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            loop {
                if *shutdown_rx.borrow_and_update() {
                    break;
                }
                tokio::select! {
                    () = tokio::time::sleep(interval) => {
                        let Some(limiter) = limiter.upgrade() else { break };
                        limiter.cleanup_idle();
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!(dimension = %dimension, "Rate limiter cleanup task shutting down");
        })
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }

    /// Forget all per-key state for `key`.
    pub fn reset(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("tracked_keys", &self.entries.len())
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}
