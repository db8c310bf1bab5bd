//! Composite limiter returning the strictest decision.

use std::sync::Arc;
use std::time::{Duration, Instant};

use toolgate_types::{ConfigError, RateLimitSettings};

use super::identity::RequestIdentity;
use super::limiter::RateLimiter;
use super::result::RateLimitResult;

/// Combines several limiters (e.g. global + per-API-key).
///
/// Limiters are checked in registration order. The first deny wins and the
/// permits already taken by earlier limiters are refunded, so a rejected call
/// costs nothing. When all allow, the result with the smallest `remaining`
/// wins and ties go to the earlier registered limiter.
#[derive(Debug, Default)]
pub struct MultiDimensionRateLimiter {
    limiters: Vec<Arc<RateLimiter>>,
}

impl MultiDimensionRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the per-dimension limiter plus the optional global limiter.
    pub fn from_settings(settings: &RateLimitSettings) -> Result<Self, ConfigError> {
        settings.validate_config()?;
        let idle = Duration::from_secs(settings.idle_timeout_seconds);

        let mut multi = Self::new();
        multi.add_limiter(Arc::new(RateLimiter::with_idle_timeout(settings.limit.clone(), idle)?));
        if let Some(global) = settings.global_config() {
            multi.add_limiter(Arc::new(RateLimiter::with_idle_timeout(global, idle)?));
        }
        Ok(multi)
    }

    pub fn add_limiter(&mut self, limiter: Arc<RateLimiter>) {
        self.limiters.push(limiter);
    }

    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.add_limiter(Arc::new(limiter));
        self
    }

    pub fn limiters(&self) -> &[Arc<RateLimiter>] {
        &self.limiters
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    pub fn check(&self, identity: &RequestIdentity) -> RateLimitResult {
        self.check_at(identity, Instant::now())
    }

    pub fn check_at(&self, identity: &RequestIdentity, now: Instant) -> RateLimitResult {
        let mut strictest: Option<RateLimitResult> = None;

        for (idx, limiter) in self.limiters.iter().enumerate() {
            let result = limiter.check_at(identity, now);
            if !result.allowed {
                for admitted in &self.limiters[..idx] {
                    admitted.refund(identity);
                }
                return result;
            }
            match &strictest {
                Some(current) if current.remaining <= result.remaining => {},
                _ => strictest = Some(result),
            }
        }

        strictest.unwrap_or_else(RateLimitResult::unlimited)
    }

    /// Sweep idle keys in every limiter. Returns the total removed.
    pub fn cleanup_idle_at(&self, now: Instant) -> usize {
        self.limiters.iter().map(|l| l.cleanup_idle_at(now)).sum()
    }

    /// Spawn one sweep task per limiter.
    pub fn start_cleanup_tasks(&self, interval: Duration) -> Vec<tokio::task::JoinHandle<()>> {
        self.limiters.iter().map(|l| l.start_cleanup_task(interval)).collect()
    }

    pub fn shutdown(&self) {
        for limiter in &self.limiters {
            limiter.shutdown();
        }
    }
}
