//! Storage-specific error types.
//!
//! All storage operations return [`StorageError`] on failure. Constraint
//! violations and connectivity loss both surface through the `Database`
//! variant; callers decide whether to retry the whole operation.

use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database operation failed (sqlx error).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
