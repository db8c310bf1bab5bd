//! Caller identity and rate limit key resolution.

use std::net::IpAddr;

use toolgate_types::RateLimitDimension;

const ANONYMOUS: &str = "anonymous";

/// Who is making an outbound call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIdentity {
    pub api_key: Option<String>,
    pub ip: Option<IpAddr>,
    pub user: Option<String>,
}

impl RequestIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Resolve the limiter key for `dimension`, e.g. `api_key:<k>` or `global`.
    ///
    /// A missing component falls back to `<dimension>:anonymous`, so all
    /// unidentified callers share one bucket.
    pub fn rate_limit_key(&self, dimension: RateLimitDimension) -> String {
        let value = match dimension {
            RateLimitDimension::Global => return "global".to_string(),
            RateLimitDimension::ApiKey => self.api_key.clone(),
            RateLimitDimension::Ip => self.ip.map(|ip| ip.to_string()),
            RateLimitDimension::User => self.user.clone(),
        };
        let value = value.filter(|v| !v.trim().is_empty());
        format!("{}:{}", dimension.as_str(), value.as_deref().unwrap_or(ANONYMOUS))
    }
}
