//! Token bucket primitive.

use std::time::Instant;

use super::result::RateLimitResult;

/// Capped, lazily refilled permit counter.
///
/// Invariant: `0 <= tokens <= capacity` after every operation.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self::with_instant(capacity, refill_rate, Instant::now())
    }

    pub fn with_instant(capacity: u32, refill_rate: f64, now: Instant) -> Self {
        let capacity = f64::from(capacity);
        Self { capacity, refill_rate, tokens: capacity, last_refill: now }
    }

    fn refill(&mut self, now: Instant) {
        if now <= self.last_refill {
            return;
        }
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Try to consume one permit.
    pub fn try_acquire(&mut self, now: Instant) -> RateLimitResult {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens = (self.tokens - 1.0).max(0.0);
            RateLimitResult::allow(self.tokens.floor() as u64, self.limit(), self.time_to_full())
        } else {
            let retry_after = (1.0 - self.tokens) / self.refill_rate;
            RateLimitResult::deny(retry_after, self.limit(), self.time_to_full())
        }
    }

    /// Permits available at `now` without consuming any.
    /// Return one token taken by `try_acquire`, capped at capacity.
    pub fn refund(&mut self) {
        self.tokens = (self.tokens + 1.0).min(self.capacity);
    }

    pub fn available(&mut self, now: Instant) -> f64 {
        self.refill(now);
        self.tokens
    }

    pub const fn tokens(&self) -> f64 {
        self.tokens
    }

    pub const fn capacity(&self) -> f64 {
        self.capacity
    }

    pub const fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    fn limit(&self) -> u64 {
        self.capacity as u64
    }

    fn time_to_full(&self) -> f64 {
        (self.capacity - self.tokens) / self.refill_rate
    }
}
