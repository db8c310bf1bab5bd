//! Application State
//!
//! Holds the shared egress pipeline for request handlers.

use std::sync::Arc;
use std::time::Instant;

use toolgate_core::proxy_pool::ProxyPool;
use toolgate_core::{AppResult, EgressPipeline};
use toolgate_types::GatewayConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub(crate) inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub pipeline: EgressPipeline,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> AppResult<Self> {
        Ok(Self::from_pipeline(EgressPipeline::new(config)?))
    }

    pub fn from_pipeline(pipeline: EgressPipeline) -> Self {
        Self { inner: Arc::new(AppStateInner { pipeline, started_at: Instant::now() }) }
    }

    pub fn pipeline(&self) -> &EgressPipeline {
        &self.inner.pipeline
    }

    /// `None` when the proxy pool is disabled.
    pub fn proxy_pool(&self) -> Option<&Arc<ProxyPool>> {
        self.inner.pipeline.proxy_pool()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}
