//! Sliding window counter primitive.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::result::RateLimitResult;

/// Counts timestamped admissions over a trailing window.
///
/// Invariant: after cleanup every retained timestamp satisfies
/// `now - ts < window`, and `len <= max_requests`.
#[derive(Debug, Clone)]
pub struct SlidingWindowCounter {
    window: Duration,
    max_requests: usize,
    timestamps: VecDeque<Instant>,
}

impl SlidingWindowCounter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self { window, max_requests, timestamps: VecDeque::with_capacity(max_requests.min(1024)) }
    }

    fn cleanup(&mut self, now: Instant) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn until_oldest_expires(&self, now: Instant) -> f64 {
        self.timestamps.front().map_or(0.0, |&oldest| {
            (oldest + self.window).saturating_duration_since(now).as_secs_f64()
        })
    }

    /// Try to record one admission at `now`.
    pub fn try_acquire(&mut self, now: Instant) -> RateLimitResult {
        self.cleanup(now);
        let limit = self.max_requests as u64;

        if self.timestamps.len() < self.max_requests {
            self.timestamps.push_back(now);
            let remaining = (self.max_requests - self.timestamps.len()) as u64;
            RateLimitResult::allow(remaining, limit, self.until_oldest_expires(now))
        } else {
            let retry_after = self.until_oldest_expires(now);
            RateLimitResult::deny(retry_after, limit, retry_after)
        }
    }

    /// Admissions currently inside the window.
    /// Forget the most recently recorded request.
    pub fn refund(&mut self) {
        self.timestamps.pop_back();
    }

    pub fn current_count(&mut self, now: Instant) -> usize {
        self.cleanup(now);
        self.timestamps.len()
    }

    /// Retained timestamps, oldest first.
    pub fn timestamps(&self) -> impl Iterator<Item = &Instant> {
        self.timestamps.iter()
    }

    pub const fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub const fn window(&self) -> Duration {
        self.window
    }
}
