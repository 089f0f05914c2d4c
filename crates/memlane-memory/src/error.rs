//! Error types for memory store operations.

/// Errors returned by the memory store and its components.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Vector index file encoding error.
    #[error("index codec error: {0}")]
    Codec(#[from] bincode::Error),
    /// Missing or malformed input.
    #[error("validation error: {0}")]
    Validation(String),
    /// Identifier or vector position already present.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    /// Vector length does not match the index dimension.
    #[error("dimension mismatch (expected={expected}, actual={actual})")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Embedding collaborator failure.
    #[error("embedding failed: {0}")]
    Embedding(String),
    /// Vector index and metadata disagree in a way that needs a rebuild.
    #[error("store corrupted: {0}")]
    Corrupted(String),
    /// Operation the configured index cannot perform.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl MemoryError {
    /// Map SQLite constraint violations to `DuplicateKey`.
    pub(crate) fn from_insert(err: rusqlite::Error, key: &str) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, _)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                MemoryError::DuplicateKey(key.to_string())
            }
            other => MemoryError::Sqlite(other),
        }
    }
}
