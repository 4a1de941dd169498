//! Errors that end a scheduler pass

use crate::alert_store::AlertStoreError;

/// Failure of a refresh-then-evaluate pass
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Alert store error: {0}")]
    Store(#[from] AlertStoreError),
}
