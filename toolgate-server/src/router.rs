use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::state::AppState;

/// Request bodies larger than this are rejected before reaching a handler.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::router(&state))
        .route("/healthz", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let proxies = state.proxy_pool().map(|pool| {
        let stats = pool.get_statistics();
        serde_json::json!({ "total": stats.total, "healthy": stats.healthy })
    });
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_seconds": state.uptime_seconds(),
            "proxies": proxies,
        })),
    )
}

async fn metrics_handler() -> impl IntoResponse {
    let metrics = toolgate_core::metrics::render_metrics();
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")], metrics)
}
