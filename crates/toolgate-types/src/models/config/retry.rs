//! Retry engine configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::ErrorCategory;
use crate::error::ConfigError;

/// Backoff and classification policy for the retry engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = single attempt)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry
    #[validate(range(min = 1_u64, message = "must be greater than zero"))]
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    /// Upper bound for any computed or server-provided delay
    #[validate(range(min = 1_u64, message = "must be greater than zero"))]
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Exponential growth factor
    #[validate(range(min = 1.0, message = "must be at least 1.0"))]
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Uniform jitter as a fraction of the delay
    #[validate(range(min = 0.0, exclusive_max = 1.0, message = "must be in [0, 1)"))]
    #[serde(default = "default_jitter")]
    pub jitter_factor: f64,
    /// Failure categories eligible for retry
    #[serde(default = "default_retryable_categories")]
    pub retryable_categories: Vec<ErrorCategory>,
    /// Status codes opted into retry regardless of their category
    #[serde(default = "default_retryable_status_codes")]
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            jitter_factor: default_jitter(),
            retryable_categories: default_retryable_categories(),
            retryable_status_codes: default_retryable_status_codes(),
        }
    }
}

impl RetryConfig {
    /// Same policy without jitter; delays become deterministic.
    pub fn without_jitter(mut self) -> Self {
        self.jitter_factor = 0.0;
        self
    }

    /// Whether a failure of `category` (with an optional HTTP status) is retryable.
    pub fn is_retryable(&self, category: ErrorCategory, status_code: Option<u16>) -> bool {
        self.retryable_categories.contains(&category)
            || status_code.is_some_and(|code| self.retryable_status_codes.contains(&code))
    }

    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::from_validation_errors(&e))?;
        if !self.multiplier.is_finite() {
            return Err(ConfigError::invalid("multiplier", "must be finite"));
        }
        if let Some(code) = self.retryable_status_codes.iter().find(|c| !(100..=599).contains(*c)) {
            return Err(ConfigError::invalid(
                "retryable_status_codes",
                format!("{} is not an HTTP status code", code),
            ));
        }
        Ok(())
    }
}

/// Retry settings for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct RetrySettings {
    /// Enable retries (disabled = exactly one attempt)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Backoff policy
    #[serde(default)]
    #[validate(nested)]
    pub policy: RetryConfig,
    /// Budget for a whole call, attempts and backoff included (None = unbounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_timeout_ms: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { enabled: true, policy: RetryConfig::default(), overall_timeout_ms: None }
    }
}

impl RetrySettings {
    /// Policy actually applied by the pipeline.
    pub fn effective_policy(&self) -> RetryConfig {
        if self.enabled {
            self.policy.clone()
        } else {
            RetryConfig { max_retries: 0, ..self.policy.clone() }
        }
    }

    pub fn validate_config(&self) -> Result<(), ConfigError> {
        if self.overall_timeout_ms == Some(0) {
            return Err(ConfigError::invalid("overall_timeout_ms", "must be greater than zero"));
        }
        self.policy.validate_config()
    }
}

const fn default_true() -> bool {
    true
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_delay() -> u64 {
    1000
}

const fn default_max_delay() -> u64 {
    30_000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_jitter() -> f64 {
    0.1
}

fn default_retryable_categories() -> Vec<ErrorCategory> {
    ErrorCategory::default_retryable().to_vec()
}

fn default_retryable_status_codes() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}
