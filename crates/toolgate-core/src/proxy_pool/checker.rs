//! Health probes issued through a proxy.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::config::ProxyConfig;
use crate::http::ClientCache;

/// Lightweight synthetic request sent through a proxy to test it.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe `url` through `proxy`. Returns the round-trip time on success.
    async fn probe(&self, proxy: &ProxyConfig, url: &str, timeout: Duration)
        -> Result<Duration, String>;

    /// Drop any cached state for a proxy removed from the pool.
    async fn forget(&self, _proxy_url: &str) {}
}

/// Issues `GET url` through a cached per-proxy `reqwest::Client`.
pub struct HttpHealthProbe {
    clients: ClientCache,
}

impl HttpHealthProbe {
    pub fn new() -> Result<Self, toolgate_types::EgressError> {
        Ok(Self { clients: ClientCache::new(Duration::from_secs(30))? })
    }

    pub const fn with_clients(clients: ClientCache) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(
        &self,
        proxy: &ProxyConfig,
        url: &str,
        timeout: Duration,
    ) -> Result<Duration, String> {
        let client = self.clients.client_for(Some(proxy)).await.map_err(|e| e.to_string())?;

        let started = Instant::now();
        let response = client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { "probe timed out".to_string() } else { e.to_string() })?;

        let status = response.status();
        if status.is_success() {
            Ok(started.elapsed())
        } else {
            Err(format!("probe returned HTTP {}", status.as_u16()))
        }
    }

    async fn forget(&self, proxy_url: &str) {
        self.clients.evict(proxy_url).await;
    }
}
