//! Error types shared across the workspace

use thiserror::Error;

/// Pricewatch-wide error type
#[derive(Error, Debug)]
pub enum PricewatchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PricewatchError {
    pub fn network(msg: impl Into<String>) -> Self {
        PricewatchError::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        PricewatchError::Parse(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        PricewatchError::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        PricewatchError::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        PricewatchError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        PricewatchError::Internal(msg.into())
    }
}

/// Result type alias for pricewatch operations
pub type PricewatchResult<T> = Result<T, PricewatchError>;
