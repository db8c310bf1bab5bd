//! Prometheus metrics for egress observability.
//!
//! Exposes metrics compatible with Prometheus/OpenMetrics format:
//! - `toolgate_rate_limit_decisions_total{dimension,allowed}` - Counter of admission checks
//! - `toolgate_retry_attempts_total{category,success}` - Counter of operation attempts
//! - `toolgate_proxy_health_transitions_total{to}` - Counter of proxy health flips
//! - `toolgate_outbound_requests_total{success}` - Counter of completed pipeline calls
//! - `toolgate_uptime_seconds` - Gauge of server uptime
//!
//! Recording is a no-op until [`init_metrics`] installs the recorder.

use std::sync::OnceLock;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use toolgate_types::{ErrorCategory, RateLimitDimension};

/// Global Prometheus handle for rendering metrics
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

static METRICS_START_TIME: OnceLock<Instant> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once; later calls
/// return the existing handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let _ = METRICS_START_TIME.get_or_init(Instant::now);
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(
        "toolgate_rate_limit_decisions_total",
        "Total rate limit checks by dimension and decision"
    );
    describe_counter!(
        "toolgate_retry_attempts_total",
        "Total outbound attempts by failure category and outcome"
    );
    describe_counter!(
        "toolgate_proxy_health_transitions_total",
        "Total proxy health flips by target state"
    );
    describe_counter!(
        "toolgate_outbound_requests_total",
        "Total outbound calls completed by the pipeline"
    );
    describe_gauge!("toolgate_uptime_seconds", "Server uptime in seconds");

    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle. `None` if metrics have not been initialized.
pub fn get_prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Render all metrics in text exposition format.
pub fn render_metrics() -> String {
    update_uptime_gauge();
    PROMETHEUS_HANDLE.get().map(PrometheusHandle::render).unwrap_or_default()
}

pub fn update_uptime_gauge() {
    if let Some(start) = METRICS_START_TIME.get() {
        gauge!("toolgate_uptime_seconds").set(start.elapsed().as_secs_f64());
    }
}

const fn bool_label(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

pub fn record_rate_limit_decision(dimension: RateLimitDimension, allowed: bool) {
    counter!(
        "toolgate_rate_limit_decisions_total",
        "dimension" => dimension.as_str(),
        "allowed" => bool_label(allowed)
    )
    .increment(1);
}

/// `category` is `None` for a successful attempt.
pub fn record_retry_attempt(category: Option<ErrorCategory>, success: bool) {
    counter!(
        "toolgate_retry_attempts_total",
        "category" => category.map_or("none", |c| c.as_str()),
        "success" => bool_label(success)
    )
    .increment(1);
}

pub fn record_proxy_health_transition(healthy: bool) {
    let to = if healthy { "healthy" } else { "unhealthy" };
    counter!("toolgate_proxy_health_transitions_total", "to" => to).increment(1);
}

pub fn record_outbound_request(success: bool) {
    counter!("toolgate_outbound_requests_total", "success" => bool_label(success)).increment(1);
}
