use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors reported by a [`Store`](crate::Store) backend.
///
/// The `Empty*` kinds are validation failures and are raised before any I/O
/// or mutation takes place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("short code cannot be empty")]
    EmptyKey,
    #[error("original url cannot be empty")]
    EmptyValue,
    #[error("owner id cannot be empty")]
    EmptyOwner,
    #[error("code list cannot be empty")]
    EmptyCodeList,
    #[error("store is not initialized")]
    NotInitialized,
    #[error("short code not found")]
    NotFound,
    #[error("short code has been deleted")]
    Gone,
    #[error("url is already shortened as {0}")]
    AlreadyExists(String),
    #[error("short code is already taken: {0}")]
    CodeConflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("snapshot i/o failed: {0}")]
    Snapshot(String),
}

impl StoreError {
    /// Returns `true` for the input validation kinds.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::EmptyKey
                | StoreError::EmptyValue
                | StoreError::EmptyOwner
                | StoreError::EmptyCodeList
        )
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Snapshot(err.to_string())
    }
}
