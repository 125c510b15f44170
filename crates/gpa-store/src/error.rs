use gpa_types::{ObjectKey, TypeError};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectKey),

    /// A key read from the backend is not a valid object key.
    #[error("invalid key: {0}")]
    InvalidKey(#[from] TypeError),

    /// The range no longer fits the object as it exists at read time.
    #[error("range not satisfiable for {key} (size {size})")]
    RangeNotSatisfiable { key: ObjectKey, size: u64 },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A background task failed before completing.
    #[error("internal store error: {0}")]
    Internal(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
