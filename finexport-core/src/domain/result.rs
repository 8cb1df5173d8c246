//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Provider-side kinds (`AuthExchange`, `NotFound`, `RateLimit`, `Transport`,
/// `Pagination`) and the sink-side `StoreWrite` are kept apart so callers can
/// tell where a run failed.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Token exchange failed: {0}")]
    AuthExchange(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Pagination error: {0}")]
    Pagination(String),

    #[error("Store write failed: {0}")]
    StoreWrite(String),

    #[error("CSV error: {0}")]
    Serialization(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a store write error
    pub fn store_write(msg: impl Into<String>) -> Self {
        Self::StoreWrite(msg.into())
    }

    /// True for errors raised by the data provider
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::AuthExchange(_)
                | Self::NotFound(_)
                | Self::RateLimit(_)
                | Self::Transport(_)
                | Self::Pagination(_)
        )
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
