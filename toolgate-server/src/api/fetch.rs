//! Outbound fetch on behalf of a tool.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use toolgate_core::middleware::{apply_rate_limit_headers, identity_from_headers};
use toolgate_core::{AuditRecord, OutboundRequest};
use toolgate_types::EgressError;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchRequest {
    pub tool_name: String,
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub success: bool,
    pub status: Option<u16>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub proxy: Option<String>,
    pub audit: AuditRecord,
}

#[derive(Debug, Serialize)]
pub struct FetchError {
    pub error: String,
    pub details: EgressError,
}

/// `200` on success, `502` with the audit trail when retries were exhausted,
/// and the error's own status when the call never left the gateway.
pub async fn fetch_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<FetchRequest>,
) -> Response {
    let identity = identity_from_headers(&headers, peer.map(|ConnectInfo(addr)| addr.ip()));
    let request = OutboundRequest {
        url: payload.url,
        method: payload.method,
        headers: payload.headers,
        body: payload.body,
    };

    match state.pipeline().execute(&request, &identity, &payload.tool_name).await {
        Ok(outcome) => {
            let success = outcome.result.success;
            let response = outcome.result.response;
            let body = FetchResponse {
                success,
                status: response.as_ref().map(|r| r.status),
                headers: response.as_ref().map(|r| r.headers.clone()).unwrap_or_default(),
                body: response.map(|r| r.body),
                proxy: outcome.proxy,
                audit: outcome.audit,
            };
            let status = if success { StatusCode::OK } else { StatusCode::BAD_GATEWAY };

            let mut http_response = (status, Json(body)).into_response();
            if let Some(decision) = &outcome.rate_limit {
                apply_rate_limit_headers(http_response.headers_mut(), decision);
            }
            http_response
        },
        Err(e) => egress_error_response(e),
    }
}

fn egress_error_response(error: EgressError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let retry_after = match &error {
        EgressError::RateLimited { retry_after_secs: Some(secs), .. } => Some(*secs),
        _ => None,
    };

    let mut response =
        (status, Json(FetchError { error: error.to_string(), details: error })).into_response();
    if let Some(secs) = retry_after {
        response.headers_mut().insert("retry-after", HeaderValue::from(secs));
    }
    response
}
