//! Store error types.

/// Store error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Referenced subscriber does not exist.
    #[error("subscriber not found")]
    NotFound,

    /// Unique constraint hit on username or connection id.
    #[error("duplicate username or connection id")]
    Duplicate,

    /// Backend error (unsupported URL scheme, row decode, etc.).
    #[error("backend error: {0}")]
    Backend(String),

    /// Underlying SQLx error.
    #[error("sql: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    /// Create a backend error from any displayable error.
    #[inline]
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    /// Map an insert/update error, detecting unique-constraint violations.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Self::Duplicate;
            }
        }
        Self::Sqlx(err)
    }
}
