//! # Backend Errors

use thiserror::Error;

use crate::model::RecordError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Durable-layer errors
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The durable layer could not service the operation.
    ///
    /// Missing durable state on reload is empty state, never this error.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// A persisted entry could not be reconstructed
    #[error("Corrupt persisted record: {0}")]
    Record(#[from] RecordError),
}

impl BackendError {
    /// Unavailable with a context message
    pub fn unavailable(context: impl Into<String>) -> Self {
        BackendError::Unavailable(context.into())
    }
}
