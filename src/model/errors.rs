//! # Model Errors

use thiserror::Error;

/// Result type for record operations
pub type RecordResult<T> = Result<T, RecordError>;

/// Record construction and reconstruction errors
#[derive(Debug, Clone, Error)]
pub enum RecordError {
    /// A timestamp string does not match the persisted format
    #[error("Malformed timestamp in '{field}': {value}")]
    MalformedTimestamp { field: String, value: String },

    /// A type tag outside the closed kind registry
    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    /// An attribute value the scalar model cannot hold
    #[error("Unsupported value for '{field}': {detail}")]
    UnsupportedValue { field: String, detail: String },
}
