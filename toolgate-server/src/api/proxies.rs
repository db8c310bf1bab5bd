//! Proxy pool management API handlers.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};

use toolgate_core::proxy_pool::{redact_proxy_url, PoolStatistics, ProxyPool};

use crate::state::AppState;

#[derive(Deserialize)]
pub struct ProxyUrlRequest {
    pub url: String,
}

#[derive(Serialize)]
pub struct AddProxyResponse {
    pub added: bool,
    pub url: String,
    pub total: usize,
}

#[derive(Serialize)]
pub struct RemoveProxyResponse {
    pub removed: bool,
    pub total: usize,
}

fn require_pool(state: &AppState) -> Result<&std::sync::Arc<ProxyPool>, (StatusCode, String)> {
    state
        .proxy_pool()
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Proxy pool is disabled".to_string()))
}

pub async fn list_proxies(
    State(state): State<AppState>,
) -> Result<Json<PoolStatistics>, (StatusCode, String)> {
    Ok(Json(require_pool(&state)?.get_statistics()))
}

/// `201` when the proxy is new, `200` when it was already in the pool.
pub async fn add_proxy(
    State(state): State<AppState>,
    Json(payload): Json<ProxyUrlRequest>,
) -> Result<(StatusCode, Json<AddProxyResponse>), (StatusCode, String)> {
    let pool = require_pool(&state)?;
    let added =
        pool.add_proxy_url(&payload.url).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(AddProxyResponse { added, url: redact_proxy_url(&payload.url), total: pool.len() }),
    ))
}

pub async fn remove_proxy(
    State(state): State<AppState>,
    Json(payload): Json<ProxyUrlRequest>,
) -> Result<Json<RemoveProxyResponse>, (StatusCode, String)> {
    let pool = require_pool(&state)?;
    if !state.pipeline().remove_proxy(&payload.url).await {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Proxy {} is not in the pool", redact_proxy_url(&payload.url)),
        ));
    }
    Ok(Json(RemoveProxyResponse { removed: true, total: pool.len() }))
}
