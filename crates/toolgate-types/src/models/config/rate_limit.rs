//! Rate limiting configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::{RateLimitAlgorithm, RateLimitDimension};
use crate::error::ConfigError;

/// Configuration for a single rate limiter. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct RateLimitConfig {
    /// Sustained refill rate
    #[validate(range(exclusive_min = 0.0, message = "must be greater than zero"))]
    pub requests_per_second: f64,
    /// Token bucket capacity
    #[validate(range(min = 1_u32, message = "must be at least 1"))]
    pub burst_size: u32,
    /// Identity dimension this limiter keys on
    #[serde(default)]
    pub dimension: RateLimitDimension,
    /// Trailing window for the sliding window algorithm
    #[validate(range(min = 1_u64, message = "must be at least 1"))]
    #[serde(default = "default_window_size")]
    pub window_size_seconds: u64,
    /// Per-key accounting algorithm
    #[serde(default)]
    pub algorithm: RateLimitAlgorithm,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10.0,
            burst_size: 20,
            dimension: RateLimitDimension::ApiKey,
            window_size_seconds: default_window_size(),
            algorithm: RateLimitAlgorithm::TokenBucket,
        }
    }
}

impl RateLimitConfig {
    /// Build and validate a token bucket configuration.
    pub fn new(
        requests_per_second: f64,
        burst_size: u32,
        dimension: RateLimitDimension,
    ) -> Result<Self, ConfigError> {
        let config = Self { requests_per_second, burst_size, dimension, ..Self::default() };
        config.validate_config()?;
        Ok(config)
    }

    /// Switch to the sliding window algorithm with the given window.
    pub fn with_sliding_window(mut self, window_size_seconds: u64) -> Self {
        self.algorithm = RateLimitAlgorithm::SlidingWindow;
        self.window_size_seconds = window_size_seconds;
        self
    }

    /// Maximum requests admitted per window by the sliding window algorithm.
    pub fn window_max_requests(&self) -> usize {
        let max = (self.requests_per_second * self.window_size_seconds as f64).ceil();
        (max as usize).max(1)
    }

    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::from_validation_errors(&e))?;
        if !self.requests_per_second.is_finite() {
            return Err(ConfigError::invalid("requests_per_second", "must be finite"));
        }
        Ok(())
    }
}

/// Rate limiting settings for the gateway: one per-dimension limiter plus an
/// optional global limiter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct RateLimitSettings {
    /// Enable admission control
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Per-dimension limiter
    #[serde(default)]
    #[validate(nested)]
    pub limit: RateLimitConfig,
    /// Global requests per second (None disables the global limiter)
    #[serde(default = "default_global_rps")]
    pub global_requests_per_second: Option<f64>,
    /// Global burst size
    #[validate(range(min = 1_u32, message = "must be at least 1"))]
    #[serde(default = "default_global_burst")]
    pub global_burst_size: u32,
    /// Keys idle longer than this are swept
    #[validate(range(min = 1_u64, message = "must be at least 1"))]
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    /// Interval of the background sweep
    #[validate(range(min = 1_u64, message = "must be at least 1"))]
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: RateLimitConfig::default(),
            global_requests_per_second: default_global_rps(),
            global_burst_size: default_global_burst(),
            idle_timeout_seconds: default_idle_timeout(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

impl RateLimitSettings {
    /// Configuration of the global limiter, if enabled.
    pub fn global_config(&self) -> Option<RateLimitConfig> {
        self.global_requests_per_second.map(|rps| RateLimitConfig {
            requests_per_second: rps,
            burst_size: self.global_burst_size,
            dimension: RateLimitDimension::Global,
            window_size_seconds: self.limit.window_size_seconds,
            algorithm: self.limit.algorithm,
        })
    }

    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::from_validation_errors(&e))?;
        self.limit.validate_config()?;
        if let Some(global) = self.global_config() {
            global.validate_config().map_err(|_| {
                ConfigError::invalid(
                    "global_requests_per_second",
                    "must be a finite value greater than zero",
                )
            })?;
        }
        Ok(())
    }
}

const fn default_true() -> bool {
    true
}

pub const fn default_window_size() -> u64 {
    60
}

#[allow(clippy::unnecessary_wraps, reason = "serde default for an Option field")]
const fn default_global_rps() -> Option<f64> {
    Some(100.0)
}

const fn default_global_burst() -> u32 {
    200
}

const fn default_idle_timeout() -> u64 {
    600 // 10 minutes
}

const fn default_cleanup_interval() -> u64 {
    60
}
