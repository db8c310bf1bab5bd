use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::rate_limit::{MultiDimensionRateLimiter, RateLimitResult, RequestIdentity};

const USER_HEADER: &str = "x-user-id";

/// Admission control for inbound requests.
///
/// Denied requests get `429` plus `Retry-After`; allowed responses carry the
/// `X-RateLimit-*` headers of the strictest limiter.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<MultiDimensionRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let identity = identity_from_request(&request);
    let decision = limiter.check(&identity);

    if !decision.allowed {
        tracing::warn!(
            path = %request.uri().path(),
            dimension = ?decision.dimension,
            retry_after = ?decision.retry_after_seconds,
            "Inbound request rate limited"
        );
        let body = serde_json::json!({
            "error": "rate_limited",
            "dimension": decision.dimension.map(|d| d.as_str()),
            "retry_after": decision.retry_after_secs_ceil(),
        });
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        apply_rate_limit_headers(response.headers_mut(), &decision);
        return response;
    }

    let mut response = next.run(request).await;
    apply_rate_limit_headers(response.headers_mut(), &decision);
    response
}

/// Copy the decision's headers onto `headers`.
pub fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitResult) {
    for (name, value) in decision.to_headers() {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            headers.insert(name, value);
        }
    }
}

/// Build the caller identity from request headers and the socket peer.
pub fn identity_from_request(request: &Request) -> RequestIdentity {
    let peer = request.extensions().get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip());
    identity_from_headers(request.headers(), peer)
}

/// Identity from `Authorization: Bearer` / `x-api-key`, the client IP and `x-user-id`.
pub fn identity_from_headers(headers: &HeaderMap, peer: Option<IpAddr>) -> RequestIdentity {
    let api_key = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .or_else(|| headers.get("x-api-key").and_then(|h| h.to_str().ok()))
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let user = headers
        .get(USER_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    RequestIdentity {
        api_key: api_key.map(str::to_string),
        ip: extract_client_ip(headers, peer),
        user: user.map(str::to_string),
    }
}

/// First `x-forwarded-for` hop, then `x-real-ip`, then the socket peer.
pub fn extract_client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse().ok())
        .or_else(|| {
            headers.get("x-real-ip").and_then(|h| h.to_str().ok()).and_then(|s| s.trim().parse().ok())
        })
        .or(peer)
}
