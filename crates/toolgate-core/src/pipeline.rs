//! Resilient outbound call: admission → egress selection → retry loop.
//!
//! ```text
//! execute(request, identity)
//!   ├── MultiDimensionRateLimiter::check   → Err(RateLimited) on deny
//!   ├── ProxyPool::get_proxy(host)         → Err(NoEgressAvailable) on None
//!   └── RetryEngine::retry_async(send via proxy), bounded by the overall deadline if set
//!         └── report_success / report_failure back to the pool per attempt
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use toolgate_types::{EgressError, GatewayConfig};

use crate::audit::{create_audit_record, AuditRecord};
use crate::error::AppResult;
use crate::http::{self, ClientCache, HttpResponse, OutboundRequest};
use crate::metrics;
use crate::proxy_pool::{parse_proxy_url, HealthProbe, HttpHealthProbe, ProxyPool};
use crate::rate_limit::{MultiDimensionRateLimiter, RateLimitResult, RequestIdentity};
use crate::retry::{FailureKind, RetryEngine, RetryEvent, RetryResult};

/// Status a proxy answers with when its own credentials are rejected.
const PROXY_AUTH_REQUIRED: u16 = 407;

/// Everything the caller gets back from one outbound call.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub result: RetryResult<HttpResponse>,
    pub audit: AuditRecord,
    /// Redacted URL of the proxy used, `None` for a direct connection
    pub proxy: Option<String>,
    /// Admission decision, `None` when rate limiting is off
    pub rate_limit: Option<RateLimitResult>,
}

/// Orchestrates rate limiting, proxy selection and retries for outbound calls.
pub struct EgressPipeline {
    config: GatewayConfig,
    limiter: Option<Arc<MultiDimensionRateLimiter>>,
    pool: Option<Arc<ProxyPool>>,
    retry: RetryEngine,
    clients: ClientCache,
    cleanup_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl EgressPipeline {
    pub fn new(config: GatewayConfig) -> AppResult<Self> {
        let probe = Arc::new(HttpHealthProbe::with_clients(ClientCache::new(Duration::from_secs(
            config.proxy_pool.health_check_timeout_seconds,
        ))?));
        Self::with_probe(config, probe)
    }

    pub fn with_probe(config: GatewayConfig, probe: Arc<dyn HealthProbe>) -> AppResult<Self> {
        config.validate_config()?;

        let limiter = if config.rate_limit.enabled {
            Some(Arc::new(MultiDimensionRateLimiter::from_settings(&config.rate_limit)?))
        } else {
            None
        };
        let pool = if config.proxy_pool.enabled {
            Some(Arc::new(ProxyPool::with_probe(config.proxy_pool.clone(), probe)?))
        } else {
            None
        };
        let retry = RetryEngine::new(config.retry.effective_policy())?;
        let clients = ClientCache::new(Duration::from_secs(config.request_timeout_seconds))?;

        tracing::info!(
            rate_limit = config.rate_limit.enabled,
            retry = config.retry.enabled,
            proxy_pool = config.proxy_pool.enabled,
            proxies = pool.as_ref().map_or(0, |p| p.len()),
            "Egress pipeline initialized"
        );

        Ok(Self { config, limiter, pool, retry, clients, cleanup_tasks: Mutex::new(Vec::new()) })
    }

    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Shared with the inbound admission middleware.
    pub const fn rate_limiter(&self) -> Option<&Arc<MultiDimensionRateLimiter>> {
        self.limiter.as_ref()
    }

    pub const fn proxy_pool(&self) -> Option<&Arc<ProxyPool>> {
        self.pool.as_ref()
    }

    /// Start the proxy health-check loop and the limiter idle sweep.
    pub fn start(&self) {
        if let Some(pool) = &self.pool {
            pool.start_health_check();
        }
        if let Some(limiter) = &self.limiter {
            let mut tasks = self.cleanup_tasks.lock();
            if tasks.is_empty() {
                let interval = Duration::from_secs(self.config.rate_limit.cleanup_interval_seconds);
                *tasks = limiter.start_cleanup_tasks(interval);
            }
        }
    }

    /// Stop background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.stop_health_check().await;
        }
        if let Some(limiter) = &self.limiter {
            limiter.shutdown();
        }
        let tasks = std::mem::take(&mut *self.cleanup_tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
        tracing::info!("Egress pipeline shut down");
    }

    /// Drop a proxy from the pool along with its cached client.
    pub async fn remove_proxy(&self, proxy_url: &str) -> bool {
        let Some(pool) = &self.pool else {
            return false;
        };
        if !pool.remove_proxy(proxy_url).await {
            return false;
        }
        if let Ok(config) = parse_proxy_url(proxy_url) {
            self.clients.evict(&config.url()).await;
        }
        true
    }

    /// Admission check without sending anything. Unlimited when rate limiting is off.
    pub fn check_rate_limit(&self, identity: &RequestIdentity) -> RateLimitResult {
        self.limiter.as_ref().map_or_else(RateLimitResult::unlimited, |l| l.check(identity))
    }

    /// Run one outbound call through admission, egress selection and retries.
    ///
    /// Exhausted retries are not an error: inspect `outcome.result.success`.
    pub async fn execute(
        &self,
        request: &OutboundRequest,
        identity: &RequestIdentity,
        tool_name: &str,
    ) -> Result<PipelineOutcome, EgressError> {
        let url = request.validate()?;
        let host = url.host_str().map(str::to_ascii_lowercase);

        let admission = self.limiter.as_ref().map(|l| l.check(identity));
        if let Some(admission) = admission.as_ref().filter(|a| !a.allowed) {
            let dimension = admission.dimension.map_or("unknown", |d| d.as_str());
            tracing::warn!(
                tool = tool_name,
                dimension,
                retry_after = ?admission.retry_after_seconds,
                "Outbound call rate limited"
            );
            return Err(EgressError::RateLimited {
                dimension: dimension.to_string(),
                retry_after_secs: admission.retry_after_secs_ceil(),
            });
        }

        let proxy = match &self.pool {
            Some(pool) => match pool.get_proxy(host.as_deref()) {
                Some(proxy) => Some(proxy),
                None => {
                    tracing::warn!(tool = tool_name, domain = ?host, "No egress available");
                    return Err(EgressError::NoEgressAvailable { domain: host });
                },
            },
            None => None,
        };

        let client = self.clients.client_for(proxy.as_deref()).await?;
        let proxy_key = proxy.as_ref().map(|p| p.url());

        let client = &client;
        let pool = self.pool.as_deref();
        let proxy_key = proxy_key.as_deref();
        let operation = || async move {
            let outcome = http::send(client, request).await;
            if let (Some(pool), Some(key)) = (pool, proxy_key) {
                match &outcome {
                    Ok(response) if response.status == PROXY_AUTH_REQUIRED => {
                        pool.report_failure(key, "proxy authentication required");
                    },
                    Ok(response) => pool.report_success(key, response.latency_ms as f64),
                    Err(e) if matches!(e.kind, FailureKind::Network | FailureKind::Timeout) => {
                        pool.report_failure(key, &e.message);
                    },
                    Err(_) => {},
                }
            }
            outcome
        };

        let on_retry = |event: &RetryEvent<'_>| {
            tracing::debug!(
                tool = tool_name,
                attempt = event.attempt.attempt_number,
                category = ?event.attempt.category,
                status = ?event.attempt.status_code,
                next_delay_ms = event.next_delay.map(|d| d.as_millis() as u64),
                "Outbound attempt failed"
            );
        };
        let result = match self.config.retry.overall_timeout_ms {
            Some(ms) => {
                self.retry.retry_with_deadline(operation, Duration::from_millis(ms), on_retry).await
            },
            None => self.retry.retry_async(operation, on_retry).await,
        };

        metrics::record_outbound_request(result.success);
        let audit = create_audit_record(tool_name, &request.url, &request.method_name(), &result);
        tracing::info!(
            tool = tool_name,
            success = result.success,
            attempts = result.total_attempts(),
            status = ?result.final_status_code(),
            duration_ms = result.total_duration_ms,
            timed_out = result.timed_out,
            "Outbound call finished"
        );

        Ok(PipelineOutcome {
            result,
            audit,
            proxy: proxy.map(|p| p.redacted_url()),
            rate_limit: admission,
        })
    }
}

impl std::fmt::Debug for EgressPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EgressPipeline")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
