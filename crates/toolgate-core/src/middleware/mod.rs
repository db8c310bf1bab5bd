// Middleware module - Axum middleware

pub mod rate_limit;

pub use rate_limit::{
    apply_rate_limit_headers, extract_client_ip, identity_from_headers, identity_from_request,
    rate_limit_middleware,
};
