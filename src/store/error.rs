use thiserror::Error;

/// Errors surfaced by the student store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique index violation on `email` (any actif state).
    #[error("duplicate email")]
    DuplicateEmail,

    #[error("{0}")]
    Validation(String),

    #[error("malformed id: {0}")]
    MalformedId(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
