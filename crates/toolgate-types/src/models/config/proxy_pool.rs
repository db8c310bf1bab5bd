//! Proxy pool configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::SelectorKind;
use crate::error::ConfigError;

/// Egress proxy pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ProxyPoolSettings {
    /// Route outbound calls through the pool (false = direct connection)
    #[serde(default)]
    pub enabled: bool,
    /// Comma-separated proxy URLs: `scheme://[user:pass@]host:port`
    /// Malformed entries are skipped when the pool is built.
    #[serde(default)]
    pub proxy_list: String,
    /// Seconds between health-check cycles
    #[validate(range(min = 1_u64, message = "must be at least 1"))]
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_seconds: u64,
    /// Per-probe timeout in seconds
    #[validate(range(min = 1_u64, message = "must be at least 1"))]
    #[serde(default = "default_health_check_timeout")]
    pub health_check_timeout_seconds: u64,
    /// URL probed through each proxy
    #[validate(url(message = "must be an absolute URL"))]
    #[serde(default = "default_health_check_url")]
    pub health_check_url: String,
    /// Consecutive failures before a proxy is excluded from selection
    #[validate(range(min = 1_u32, message = "must be at least 1"))]
    #[serde(default = "default_unhealthy_threshold")]
    pub unhealthy_threshold: u32,
    /// Seconds an unhealthy proxy must wait before a live success may re-admit it
    #[serde(default = "default_recovery_interval")]
    pub recovery_interval_seconds: u64,
    /// Selection strategy
    #[serde(default)]
    pub selector: SelectorKind,
}

impl Default for ProxyPoolSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            proxy_list: String::new(),
            health_check_interval_seconds: default_health_check_interval(),
            health_check_timeout_seconds: default_health_check_timeout(),
            health_check_url: default_health_check_url(),
            unhealthy_threshold: default_unhealthy_threshold(),
            recovery_interval_seconds: default_recovery_interval(),
            selector: SelectorKind::default(),
        }
    }
}

impl ProxyPoolSettings {
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::from_validation_errors(&e))
    }
}

const fn default_health_check_interval() -> u64 {
    60
}

const fn default_health_check_timeout() -> u64 {
    10
}

fn default_health_check_url() -> String {
    "https://httpbin.org/ip".to_string()
}

const fn default_unhealthy_threshold() -> u32 {
    3
}

const fn default_recovery_interval() -> u64 {
    300 // 5 minutes
}
