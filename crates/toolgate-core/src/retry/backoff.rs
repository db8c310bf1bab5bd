//! Backoff delay computation.

use std::time::Duration;

use rand::Rng;
use toolgate_types::RetryConfig;

/// Exponential delay before retry number `attempt + 1`, without jitter:
/// `min(initial_delay_ms * multiplier^attempt, max_delay_ms)`.
pub fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let raw = config.initial_delay_ms as f64 * config.multiplier.powi(exponent);
    let max = config.max_delay_ms as f64;
    let ms = if raw.is_finite() { raw.min(max) } else { max };
    Duration::from_millis(ms.max(0.0) as u64)
}

/// Spread `delay` uniformly over `delay * (1 ± factor)`, floored at zero.
pub fn apply_jitter(delay: Duration, factor: f64) -> Duration {
    if factor <= 0.0 || delay.is_zero() {
        return delay;
    }
    let base = delay.as_millis() as f64;
    let range = base * factor;
    let jittered = base + rand::thread_rng().gen_range(-range..=range);
    Duration::from_millis(jittered.max(0.0).round() as u64)
}

/// Parse a `Retry-After` header given in whole seconds. HTTP dates and
/// negative or fractional values are ignored.
pub fn parse_retry_after(header: &str) -> Option<Duration> {
    header.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Delay actually waited before the next attempt.
///
/// A parseable `Retry-After` replaces the jittered backoff and is capped at
/// `max_delay_ms`.
pub fn next_delay(config: &RetryConfig, attempt: u32, retry_after: Option<&str>) -> Duration {
    let max = Duration::from_millis(config.max_delay_ms);
    match retry_after.and_then(parse_retry_after) {
        Some(server_delay) => server_delay.min(max),
        None => apply_jitter(calculate_delay(config, attempt), config.jitter_factor),
    }
}
