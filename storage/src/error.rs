//! Storage error types.
//!
//! Used by the session, the statement builder, and repository callers.

use thiserror::Error;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// A single-row operation matched zero rows.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single-row operation matched more than one row; the caller's
    /// filter is underspecified.
    #[error("Ambiguous match: {0}")]
    Ambiguous(String),

    /// Uniqueness / foreign-key / check violation reported by the database.
    /// Never retried here; retrying the same input cannot succeed.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Pool exhausted or the database is unreachable.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// The session was closed; open a new one to continue.
    #[error("Session is closed")]
    SessionClosed,

    /// A statement could not be built from the given values/filters.
    #[error("Invalid statement: {0}")]
    Statement(String),

    /// Any other database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StorageError::NotFound(err.to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Connectivity(err.to_string())
            }
            sqlx::Error::Database(db)
                if db.is_unique_violation()
                    || db.is_foreign_key_violation()
                    || db.is_check_violation() =>
            {
                StorageError::Constraint(db.message().to_string())
            }
            _ => StorageError::Database(err.to_string()),
        }
    }
}
