//! Price source errors

use thiserror::Error;

/// Why a source did not produce a usable price.
///
/// Callers treat both variants the same way: move on to the next source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Timeout, transport failure, non-success status, or an asset/currency
    /// the source cannot serve
    #[error("{source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    /// Success status but the body did not contain a valid non-negative price
    #[error("{source_name} returned a malformed response: {reason}")]
    Malformed { source_name: String, reason: String },
}

impl SourceError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        SourceError::Unavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        SourceError::Malformed {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Name of the source that failed
    pub fn source_name(&self) -> &str {
        match self {
            SourceError::Unavailable { source_name, .. } => source_name,
            SourceError::Malformed { source_name, .. } => source_name,
        }
    }
}
