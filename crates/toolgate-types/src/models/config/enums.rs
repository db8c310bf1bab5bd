//! Configuration enums for rate limiting, proxy selection and failure taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Identity dimension a rate limiter keys on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitDimension {
    /// One bucket per API key
    #[default]
    ApiKey,
    /// One bucket per client IP
    Ip,
    /// One bucket per authenticated user
    User,
    /// A single process-wide bucket
    Global,
}

impl RateLimitDimension {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::Ip => "ip",
            Self::User => "user",
            Self::Global => "global",
        }
    }
}

impl fmt::Display for RateLimitDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateLimitDimension {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api_key" | "apikey" | "key" => Ok(Self::ApiKey),
            "ip" => Ok(Self::Ip),
            "user" => Ok(Self::User),
            "global" => Ok(Self::Global),
            other => Err(ConfigError::ParseError {
                message: format!("unknown rate limit dimension '{}'", other),
            }),
        }
    }
}

/// Per-key accounting algorithm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitAlgorithm {
    /// Capped, continuously refilled permits
    #[default]
    TokenBucket,
    /// Timestamped events counted over a trailing window
    SlidingWindow,
}

impl fmt::Display for RateLimitAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::TokenBucket => write!(f, "token_bucket"),
            Self::SlidingWindow => write!(f, "sliding_window"),
        }
    }
}

impl FromStr for RateLimitAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token_bucket" | "bucket" => Ok(Self::TokenBucket),
            "sliding_window" | "window" => Ok(Self::SlidingWindow),
            other => Err(ConfigError::ParseError {
                message: format!("unknown rate limit algorithm '{}'", other),
            }),
        }
    }
}

/// Proxy protocol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProxyProtocol {
    #[default]
    Http,
    Https,
    Socks5,
}

impl ProxyProtocol {
    pub const fn scheme(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Socks5 => "socks5",
        }
    }

    /// Parse a URL scheme. `socks5h` is folded into `socks5`.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            "socks5" | "socks5h" => Some(Self::Socks5),
            _ => None,
        }
    }
}

impl fmt::Display for ProxyProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Proxy selection strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    /// Cycle through healthy proxies in insertion order
    #[default]
    RoundRobin,
    /// Prefer the proxy with the lowest average latency
    LatencyBased,
    /// Uniformly sample healthy proxies
    Random,
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::RoundRobin => write!(f, "round_robin"),
            Self::LatencyBased => write!(f, "latency_based"),
            Self::Random => write!(f, "random"),
        }
    }
}

impl FromStr for SelectorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "round_robin" | "roundrobin" => Ok(Self::RoundRobin),
            "latency_based" | "latency" => Ok(Self::LatencyBased),
            "random" => Ok(Self::Random),
            other => Err(ConfigError::ParseError {
                message: format!("unknown proxy selector '{}'", other),
            }),
        }
    }
}

/// Failure taxonomy used by the retry engine and the audit trail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Connection refused, DNS failure, reset
    Network,
    /// Connect or read timeout
    Timeout,
    /// HTTP 429
    RateLimit,
    /// HTTP 5xx
    Server,
    /// HTTP 4xx other than 429
    Client,
    /// Anything else
    Unknown,
}

impl ErrorCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::RateLimit => "rate_limit",
            Self::Server => "server",
            Self::Client => "client",
            Self::Unknown => "unknown",
        }
    }

    /// Categories retried when no explicit list is configured.
    pub const fn default_retryable() -> [Self; 4] {
        [Self::Network, Self::Timeout, Self::RateLimit, Self::Server]
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "network" => Ok(Self::Network),
            "timeout" => Ok(Self::Timeout),
            "rate_limit" => Ok(Self::RateLimit),
            "server" => Ok(Self::Server),
            "client" => Ok(Self::Client),
            "unknown" => Ok(Self::Unknown),
            other => Err(ConfigError::ParseError {
                message: format!("unknown error category '{}'", other),
            }),
        }
    }
}
