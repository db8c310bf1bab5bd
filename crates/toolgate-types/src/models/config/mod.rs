//! Gateway, rate limit, retry and proxy pool configuration models.

mod enums;
mod gateway;
mod proxy_pool;
mod rate_limit;
mod retry;


pub use enums::{ErrorCategory, ProxyProtocol, RateLimitAlgorithm, RateLimitDimension, SelectorKind};
pub use gateway::GatewayConfig;
pub use proxy_pool::ProxyPoolSettings;
pub use rate_limit::{RateLimitConfig, RateLimitSettings};
pub use retry::{RetryConfig, RetrySettings};
