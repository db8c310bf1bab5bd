//! Configuration models for the Toolgate egress layer.

mod config;

pub use config::{
    ErrorCategory, GatewayConfig, ProxyPoolSettings, ProxyProtocol, RateLimitAlgorithm,
    RateLimitConfig, RateLimitDimension, RateLimitSettings, RetryConfig, RetrySettings,
    SelectorKind,
};
