use crate::address::StorageAddress;

/// Errors reported by a [`StorageBackend`](crate::StorageBackend).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The addressed object does not exist.
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// The storage service rejected the request (permissions, throttling,
    /// missing bucket, ...).
    #[error(
        "storage service error ({}): {message}",
        .code.as_deref().unwrap_or("unknown")
    )]
    Service {
        code: Option<String>,
        message: String,
        status: Option<u16>,
    },

    /// The request never completed: dispatch failure, timeout, or a broken
    /// response body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request could not be constructed from the supplied input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl BackendError {
    /// Returns `true` for the not-found signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors from document store and folder operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A bucket, key, or prefix failed validation. Raised before any request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The value could not be converted to JSON text.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The stored bytes are not UTF-8 JSON text.
    #[error("malformed document at {address}: {reason}")]
    MalformedDocument {
        address: StorageAddress,
        reason: String,
    },

    /// Pass-through failure from the storage backend.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StoreError {
    /// Returns `true` if the underlying backend reported a missing object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_not_found())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
