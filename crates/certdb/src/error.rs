//! Trust store error types.

use thiserror::Error;

/// Trust store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A unique constraint rejected an insert: a duplicate import, or a
    /// lost select-or-insert race against another writer. Retryable.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The referenced release does not exist.
    #[error("unknown release: {0}")]
    UnknownRelease(String),

    /// The release has no predecessor to roll certificates from.
    #[error("no release prior to {0}")]
    NoPriorRelease(String),

    #[error(transparent)]
    Core(#[from] anchorage_core::Error),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err
            && db.is_unique_violation()
        {
            return StoreError::Conflict(db.message().to_string());
        }
        StoreError::Database(err)
    }
}

/// Result type for trust store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
