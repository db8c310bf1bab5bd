//! Test helpers for toolgate-server unit tests.

use axum_test::TestServer;
use toolgate_types::{
    GatewayConfig, ProxyPoolSettings, RateLimitConfig, RateLimitDimension, RateLimitSettings,
    RetryConfig, RetrySettings,
};

use crate::router::build_router;
use crate::state::AppState;

/// Gateway with fast retries and every optional stage turned off.
pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        rate_limit: RateLimitSettings { enabled: false, ..RateLimitSettings::default() },
        retry: RetrySettings {
            enabled: true,
            policy: RetryConfig {
                max_retries: 2,
                initial_delay_ms: 1,
                max_delay_ms: 5,
                jitter_factor: 0.0,
                ..RetryConfig::default()
            },
            overall_timeout_ms: None,
        },
        proxy_pool: ProxyPoolSettings::default(),
        request_timeout_seconds: 5,
    }
}

/// Per-API-key limiter that effectively never refills.
pub fn with_rate_limit(mut config: GatewayConfig, burst: u32) -> GatewayConfig {
    config.rate_limit = RateLimitSettings {
        enabled: true,
        limit: RateLimitConfig {
            requests_per_second: 0.001,
            burst_size: burst,
            dimension: RateLimitDimension::ApiKey,
            ..RateLimitConfig::default()
        },
        global_requests_per_second: None,
        ..RateLimitSettings::default()
    };
    config
}

pub fn with_proxy_pool(mut config: GatewayConfig, proxy_list: &str) -> GatewayConfig {
    config.proxy_pool =
        ProxyPoolSettings { enabled: true, proxy_list: proxy_list.to_string(), ..ProxyPoolSettings::default() };
    config
}

pub fn test_server(config: GatewayConfig) -> TestServer {
    let state = AppState::new(config).unwrap();
    TestServer::new(build_router(state)).unwrap()
}
