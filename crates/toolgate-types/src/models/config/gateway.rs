//! Top-level gateway configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::proxy_pool::ProxyPoolSettings;
use super::rate_limit::RateLimitSettings;
use super::retry::RetrySettings;
use crate::error::ConfigError;

/// Full configuration of the outbound resilience layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct GatewayConfig {
    /// Admission control
    #[serde(default)]
    #[validate(nested)]
    pub rate_limit: RateLimitSettings,
    /// Retry policy
    #[serde(default)]
    #[validate(nested)]
    pub retry: RetrySettings,
    /// Egress proxy pool
    #[serde(default)]
    #[validate(nested)]
    pub proxy_pool: ProxyPoolSettings,
    /// Per-attempt HTTP timeout in seconds
    #[validate(range(min = 1_u64, max = 3600_u64))]
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitSettings::default(),
            retry: RetrySettings::default(),
            proxy_pool: ProxyPoolSettings::default(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl GatewayConfig {
    /// Validate every section; the first failure wins.
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.rate_limit.validate_config()?;
        self.retry.validate_config()?;
        self.proxy_pool.validate_config()?;
        self.validate().map_err(|e| ConfigError::from_validation_errors(&e))
    }
}

pub const fn default_request_timeout() -> u64 {
    30
}
