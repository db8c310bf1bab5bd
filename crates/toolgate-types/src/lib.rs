//! # Toolgate Types
//!
//! Core types and error definitions for the Toolgate egress layer.
//!
//! - **`error`** - Typed error hierarchy for configuration and egress failures
//! - **`models`** - Typed, validated configuration for rate limiting, retry and the proxy pool
//!
//! ## Architecture Role
//!
//! `toolgate-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!          toolgate-types (this crate)
//!                  │
//!                  ▼
//!            toolgate-core
//!                  │
//!                  ▼
//!           toolgate-server
//! ```
//!
//! Configuration structs are validated eagerly: every constructor in
//! `toolgate-core` calls `validate_config()` and refuses invalid values.

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ConfigError, EgressError, Result, TypedError};

// Re-export core model types
pub use models::{
    ErrorCategory, GatewayConfig, ProxyPoolSettings, ProxyProtocol, RateLimitAlgorithm,
    RateLimitConfig, RateLimitDimension, RateLimitSettings, RetryConfig, RetrySettings,
    SelectorKind,
};
