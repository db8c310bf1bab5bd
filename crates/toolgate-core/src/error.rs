//! Unified error type for Toolgate Core.

use serde::Serialize;
use thiserror::Error;
use toolgate_types::{ConfigError, EgressError};

/// Main error type for core operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Configuration was rejected at construction.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Outbound call was stopped before or while it was sent.
    #[error(transparent)]
    Egress(#[from] EgressError),
}

impl AppError {
    /// HTTP status the server should answer with.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 400,
            Self::Egress(e) => e.http_status_code(),
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for core operations.
pub type AppResult<T> = Result<T, AppError>;
