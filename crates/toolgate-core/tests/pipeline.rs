//! End-to-end behaviour of `EgressPipeline` against local mock servers.

use std::time::{Duration, Instant};

use toolgate_core::{EgressPipeline, OutboundRequest, RequestIdentity};
use toolgate_types::{
    EgressError, ErrorCategory, GatewayConfig, ProxyPoolSettings, RateLimitConfig,
    RateLimitDimension, RateLimitSettings, RetryConfig, RetrySettings,
};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Unreachable port: connections are refused immediately.
const DEAD_PROXY: &str = "http://127.0.0.1:1";

fn config() -> GatewayConfig {
    GatewayConfig {
        rate_limit: RateLimitSettings { enabled: false, ..RateLimitSettings::default() },
        retry: RetrySettings {
            enabled: true,
            policy: RetryConfig {
                max_retries: 3,
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

fn rate_limited_config(burst: u32) -> GatewayConfig {
    GatewayConfig {
        rate_limit: RateLimitSettings {
            enabled: true,
            limit: RateLimitConfig::new(0.001, burst, RateLimitDimension::ApiKey).unwrap(),
            global_requests_per_second: None,
            ..RateLimitSettings::default()
        },
        ..config()
    }
}

fn pooled_config(proxy_list: &str) -> GatewayConfig {
    GatewayConfig {
        proxy_pool: ProxyPoolSettings {
            enabled: true,
            proxy_list: proxy_list.to_string(),
            unhealthy_threshold: 2,
            ..ProxyPoolSettings::default()
        },
        ..config()
    }
}

fn caller(key: &str) -> RequestIdentity {
    RequestIdentity::new().with_api_key(key)
}

#[tokio::test]
async fn test_flaky_upstream_recovers_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&server)
        .await;

    let pipeline = EgressPipeline::new(config()).unwrap();
    let request = OutboundRequest::get(format!("{}/flaky", server.uri()));
    let outcome = pipeline.execute(&request, &caller("k"), "web_fetch").await.unwrap();

    assert!(outcome.result.success);
    assert_eq!(outcome.result.total_attempts(), 3);
    assert_eq!(outcome.result.response.as_ref().map(|r| r.body.as_str()), Some("hello"));
    assert_eq!(outcome.proxy, None);
    assert_eq!(outcome.rate_limit, None);

    let audit = outcome.audit;
    assert_eq!(audit.tool_name, "web_fetch");
    assert_eq!(audit.method, "GET");
    assert_eq!(audit.retries_count, 2);
    assert_eq!(audit.final_status_code, Some(200));
    assert_eq!(audit.attempts[0].category, Some(ErrorCategory::Server));
    assert_eq!(audit.attempts[0].status_code, Some(503));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = EgressPipeline::new(config()).unwrap();
    let request = OutboundRequest::get(format!("{}/bad", server.uri()));
    let outcome = pipeline.execute(&request, &caller("k"), "web_fetch").await.unwrap();

    assert!(!outcome.result.success);
    assert_eq!(outcome.result.total_attempts(), 1);
    assert_eq!(outcome.result.final_status_code(), Some(400));
    assert_eq!(outcome.result.final_category(), Some(ErrorCategory::Client));
    assert!(outcome.audit.final_error.is_some());
}

#[tokio::test]
async fn test_exhausted_retries_keep_last_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(502))
        .expect(4)
        .mount(&server)
        .await;

    let pipeline = EgressPipeline::new(config()).unwrap();
    let request = OutboundRequest::get(format!("{}/down", server.uri()));
    let outcome = pipeline.execute(&request, &caller("k"), "web_fetch").await.unwrap();

    assert!(!outcome.result.success);
    assert_eq!(outcome.result.total_attempts(), 4);
    assert_eq!(outcome.result.response.as_ref().map(|r| r.status), Some(502));
    assert_eq!(outcome.audit.retries_count, 3);
}

#[tokio::test]
async fn test_retry_disabled_means_single_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let mut single = config();
    single.retry.enabled = false;
    let pipeline = EgressPipeline::new(single).unwrap();
    let request = OutboundRequest::get(server.uri());
    let outcome = pipeline.execute(&request, &caller("k"), "web_fetch").await.unwrap();

    assert!(!outcome.result.success);
    assert_eq!(outcome.result.total_attempts(), 1);
}

#[tokio::test]
async fn test_overall_deadline_stops_slow_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let mut bounded = config();
    bounded.retry.overall_timeout_ms = Some(100);
    let pipeline = EgressPipeline::new(bounded).unwrap();
    let request = OutboundRequest::get(format!("{}/slow", server.uri()));

    let started = Instant::now();
    let outcome = pipeline.execute(&request, &caller("k"), "web_fetch").await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!outcome.result.success);
    assert!(outcome.result.timed_out);
    assert_eq!(outcome.result.final_category(), Some(ErrorCategory::Timeout));
}

#[tokio::test]
async fn test_method_headers_and_body_are_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(header("x-trace", "abc"))
        .and(body_string("payload"))
        .respond_with(ResponseTemplate::new(201).insert_header("x-upstream", "yes"))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = EgressPipeline::new(config()).unwrap();
    let request = OutboundRequest::new("post", format!("{}/submit", server.uri()))
        .with_header("x-trace", "abc")
        .with_body("payload");
    let outcome = pipeline.execute(&request, &caller("k"), "archive").await.unwrap();

    assert!(outcome.result.success);
    let response = outcome.result.response.unwrap();
    assert_eq!(response.status, 201);
    assert_eq!(response.header("X-Upstream"), Some("yes"));
    assert_eq!(outcome.audit.method, "POST");
}

#[tokio::test]
async fn test_rate_limited_caller_is_rejected_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let pipeline = EgressPipeline::new(rate_limited_config(1)).unwrap();
    let request = OutboundRequest::get(server.uri());

    let first = pipeline.execute(&request, &caller("alice"), "web_fetch").await.unwrap();
    assert!(first.result.success);
    let admission = first.rate_limit.unwrap();
    assert!(admission.allowed);
    assert_eq!(admission.remaining, 0);

    match pipeline.execute(&request, &caller("alice"), "web_fetch").await {
        Err(EgressError::RateLimited { dimension, retry_after_secs }) => {
            assert_eq!(dimension, "api_key");
            assert!(retry_after_secs.is_some_and(|s| s >= 1));
        },
        other => panic!("expected rate limit denial, got {:?}", other),
    }

    let other = pipeline.execute(&request, &caller("bob"), "web_fetch").await.unwrap();
    assert!(other.result.success);
}

#[tokio::test]
async fn test_invalid_request_does_not_consume_quota() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = EgressPipeline::new(rate_limited_config(1)).unwrap();

    for bad in [
        OutboundRequest::get("not a url"),
        OutboundRequest::get("ftp://files.example.com/a"),
        OutboundRequest::new("BAD METHOD", server.uri()),
    ] {
        let err = pipeline.execute(&bad, &caller("alice"), "web_fetch").await.unwrap_err();
        assert!(matches!(err, EgressError::InvalidRequest { .. }), "{:?}", err);
        assert_eq!(err.http_status_code(), 400);
    }

    let ok = pipeline
        .execute(&OutboundRequest::get(server.uri()), &caller("alice"), "web_fetch")
        .await
        .unwrap();
    assert!(ok.result.success);
}

#[tokio::test]
async fn test_empty_pool_means_no_egress() {
    let pipeline = EgressPipeline::new(pooled_config("")).unwrap();
    let request = OutboundRequest::get("http://Example.COM/page");

    let err = pipeline.execute(&request, &caller("k"), "web_fetch").await.unwrap_err();
    assert_eq!(err, EgressError::NoEgressAvailable { domain: Some("example.com".to_string()) });
    assert_eq!(err.http_status_code(), 503);
}

#[tokio::test]
async fn test_dead_proxy_is_marked_unhealthy() {
    let mut config = pooled_config(DEAD_PROXY);
    config.retry.policy.max_retries = 1;
    let pipeline = EgressPipeline::new(config).unwrap();
    let request = OutboundRequest::get("http://upstream.invalid/");

    let outcome = pipeline.execute(&request, &caller("k"), "web_fetch").await.unwrap();
    assert!(!outcome.result.success);
    assert_eq!(outcome.result.total_attempts(), 2);
    assert_eq!(outcome.result.final_category(), Some(ErrorCategory::Network));
    assert!(outcome.proxy.is_some());

    let pool = pipeline.proxy_pool().unwrap();
    let health = pool.health_of(DEAD_PROXY).unwrap();
    assert!(!health.is_healthy);
    assert_eq!(health.consecutive_failures, 2);

    let err = pipeline.execute(&request, &caller("k"), "web_fetch").await.unwrap_err();
    assert!(matches!(err, EgressError::NoEgressAvailable { .. }));

    assert!(pipeline.remove_proxy(DEAD_PROXY).await);
    assert!(pool.is_empty());
    assert!(!pipeline.remove_proxy(DEAD_PROXY).await);
}

#[tokio::test]
async fn test_start_and_shutdown_are_repeatable() {
    let mut config = rate_limited_config(5);
    config.proxy_pool = pooled_config(DEAD_PROXY).proxy_pool;
    config.proxy_pool.health_check_url = "http://127.0.0.1:1/".to_string();
    config.proxy_pool.health_check_timeout_seconds = 1;
    let pipeline = EgressPipeline::new(config).unwrap();

    pipeline.start();
    pipeline.start();
    assert!(pipeline.proxy_pool().unwrap().is_health_check_running());

    pipeline.shutdown().await;
    assert!(!pipeline.proxy_pool().unwrap().is_health_check_running());
    pipeline.shutdown().await;
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut bad_jitter = config();
    bad_jitter.retry.policy.jitter_factor = 1.5;
    assert!(EgressPipeline::new(bad_jitter).is_err());

    let mut bad_timeout = config();
    bad_timeout.request_timeout_seconds = 0;
    assert!(EgressPipeline::new(bad_timeout).is_err());
}
