use clap::Parser;
use toolgate_types::{
    ConfigError, GatewayConfig, ProxyPoolSettings, RateLimitAlgorithm, RateLimitConfig,
    RateLimitDimension, RateLimitSettings, RetryConfig, RetrySettings, SelectorKind,
};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "toolgate",
    about = "Toolgate Server - outbound rate limiting, proxy rotation and retries for tool calls",
    version = env!("CARGO_PKG_VERSION"),
    author
)]
pub struct Cli {
    #[arg(short, long, env = "TOOLGATE_PORT", default_value = "8046")]
    pub port: u16,

    #[arg(long, env = "TOOLGATE_BIND", default_value = "127.0.0.1")]
    pub bind: String,

    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    // Rate limiting
    #[arg(long, env = "TOOLGATE_RATE_LIMIT_ENABLED", default_value_t = true, action = clap::ArgAction::Set)]
    pub rate_limit_enabled: bool,

    #[arg(long, env = "TOOLGATE_RATE_LIMIT_RPS", default_value_t = 10.0)]
    pub rate_limit_rps: f64,

    #[arg(long, env = "TOOLGATE_RATE_LIMIT_BURST", default_value_t = 20)]
    pub rate_limit_burst: u32,

    #[arg(long, env = "TOOLGATE_RATE_LIMIT_DIMENSION", default_value = "api_key")]
    pub rate_limit_dimension: RateLimitDimension,

    #[arg(long, env = "TOOLGATE_RATE_LIMIT_ALGORITHM", default_value = "token_bucket")]
    pub rate_limit_algorithm: RateLimitAlgorithm,

    #[arg(long, env = "TOOLGATE_RATE_LIMIT_WINDOW_SECONDS", default_value_t = 60)]
    pub rate_limit_window_seconds: u64,

    #[arg(long, env = "TOOLGATE_GLOBAL_RPS", default_value_t = 100.0, help = "0 disables the global limiter")]
    pub global_rps: f64,

    #[arg(long, env = "TOOLGATE_GLOBAL_BURST", default_value_t = 200)]
    pub global_burst: u32,

    #[arg(long, env = "TOOLGATE_RATE_LIMIT_IDLE_SECONDS", default_value_t = 600)]
    pub rate_limit_idle_seconds: u64,

    // Retry
    #[arg(long, env = "TOOLGATE_RETRY_ENABLED", default_value_t = true, action = clap::ArgAction::Set)]
    pub retry_enabled: bool,

    #[arg(long, env = "TOOLGATE_RETRY_MAX_RETRIES", default_value_t = 3)]
    pub retry_max_retries: u32,

    #[arg(long, env = "TOOLGATE_RETRY_INITIAL_DELAY_MS", default_value_t = 1000)]
    pub retry_initial_delay_ms: u64,

    #[arg(long, env = "TOOLGATE_RETRY_MAX_DELAY_MS", default_value_t = 30_000)]
    pub retry_max_delay_ms: u64,

    #[arg(long, env = "TOOLGATE_RETRY_MULTIPLIER", default_value_t = 2.0)]
    pub retry_multiplier: f64,

    #[arg(long, env = "TOOLGATE_RETRY_JITTER", default_value_t = 0.1)]
    pub retry_jitter: f64,

    #[arg(long, env = "TOOLGATE_RETRY_OVERALL_TIMEOUT_MS", help = "Deadline for a whole call including retries")]
    pub retry_overall_timeout_ms: Option<u64>,

    // Proxy pool
    #[arg(long, env = "TOOLGATE_PROXY_POOL_ENABLED", default_value_t = false, action = clap::ArgAction::Set)]
    pub proxy_pool_enabled: bool,

    #[arg(long, env = "TOOLGATE_PROXY_LIST", default_value = "", help = "Comma-separated proxy URLs")]
    pub proxy_list: String,

    #[arg(long, env = "TOOLGATE_HEALTH_CHECK_INTERVAL", default_value_t = 60)]
    pub health_check_interval: u64,

    #[arg(long, env = "TOOLGATE_HEALTH_CHECK_TIMEOUT", default_value_t = 10)]
    pub health_check_timeout: u64,

    #[arg(long, env = "TOOLGATE_HEALTH_CHECK_URL", default_value = "https://httpbin.org/ip")]
    pub health_check_url: String,

    #[arg(long, env = "TOOLGATE_UNHEALTHY_THRESHOLD", default_value_t = 3)]
    pub unhealthy_threshold: u32,

    #[arg(long, env = "TOOLGATE_RECOVERY_INTERVAL", default_value_t = 300)]
    pub recovery_interval: u64,

    #[arg(long, env = "TOOLGATE_PROXY_SELECTOR", default_value = "round_robin")]
    pub proxy_selector: SelectorKind,

    #[arg(long, env = "TOOLGATE_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout: u64,
}

impl Cli {
    /// Map flags onto a validated `GatewayConfig`.
    pub fn gateway_config(&self) -> Result<GatewayConfig, ConfigError> {
        let limit = RateLimitConfig {
            requests_per_second: self.rate_limit_rps,
            burst_size: self.rate_limit_burst,
            dimension: self.rate_limit_dimension,
            window_size_seconds: self.rate_limit_window_seconds,
            algorithm: self.rate_limit_algorithm,
        };
        let rate_limit = RateLimitSettings {
            enabled: self.rate_limit_enabled,
            limit,
            global_requests_per_second: (self.global_rps > 0.0).then_some(self.global_rps),
            global_burst_size: self.global_burst,
            idle_timeout_seconds: self.rate_limit_idle_seconds,
            ..RateLimitSettings::default()
        };
        let retry = RetrySettings {
            enabled: self.retry_enabled,
            policy: RetryConfig {
                max_retries: self.retry_max_retries,
                initial_delay_ms: self.retry_initial_delay_ms,
                max_delay_ms: self.retry_max_delay_ms,
                multiplier: self.retry_multiplier,
                jitter_factor: self.retry_jitter,
                ..RetryConfig::default()
            },
            overall_timeout_ms: self.retry_overall_timeout_ms,
        };
        let proxy_pool = ProxyPoolSettings {
            enabled: self.proxy_pool_enabled,
            proxy_list: self.proxy_list.clone(),
            health_check_interval_seconds: self.health_check_interval,
            health_check_timeout_seconds: self.health_check_timeout,
            health_check_url: self.health_check_url.clone(),
            unhealthy_threshold: self.unhealthy_threshold,
            recovery_interval_seconds: self.recovery_interval,
            selector: self.proxy_selector,
        };

        let config = GatewayConfig {
            rate_limit,
            retry,
            proxy_pool,
            request_timeout_seconds: self.request_timeout,
        };
        config.validate_config()?;
        Ok(config)
    }
}
