//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors with additional context about which operation failed.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The requested record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind (`simulation`, `map`, `vehicle`).
        entity: &'static str,
        /// The missing identifier.
        id: i64,
    },

    /// A stored row could not be converted into its domain type.
    #[error("invalid {entity} row {id}: {reason}")]
    InvalidRow {
        /// Entity kind.
        entity: &'static str,
        /// Row identifier.
        id: i64,
        /// What was wrong with the row.
        reason: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Whether this error reports a missing record.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
