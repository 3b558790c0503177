//! Error types for memory operations.

/// Errors returned by the memory store and its backends.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Malformed caller input (empty identifiers, zero limits, bad import rows).
    #[error("validation error: {0}")]
    Validation(String),
    /// Argument outside the accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The persistence layer failed; propagated verbatim, never retried.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for MemoryError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for MemoryError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}
