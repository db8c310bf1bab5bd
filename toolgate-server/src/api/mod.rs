//! API Routes
//!
//! `/v1/fetch` runs a tool's outbound call through the egress pipeline;
//! `/api/proxies` manages the proxy pool at runtime and sits behind the
//! inbound rate-limit middleware. `/v1/fetch` is admitted by the pipeline
//! itself.

mod fetch;
mod proxies;


use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use toolgate_core::middleware::rate_limit_middleware;

use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let admin = Router::new().route(
        "/api/proxies",
        get(proxies::list_proxies).post(proxies::add_proxy).delete(proxies::remove_proxy),
    );
    let admin = match state.pipeline().rate_limiter() {
        Some(limiter) => admin
            .route_layer(middleware::from_fn_with_state(Arc::clone(limiter), rate_limit_middleware)),
        None => admin,
    };

    Router::new().route("/v1/fetch", post(fetch::fetch_handler)).merge(admin)
}
