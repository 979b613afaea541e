//! Error types for lifecycle transitions.
//!
//! [`LifecycleError`] is what every controller operation returns. Its
//! [`kind`](LifecycleError::kind) is what the transport maps to a status
//! code; the message is what the caller reads.

use simctl_db::DbError;

/// Coarse classification of a failed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The referenced simulation (or a record it needs) does not exist.
    NotFound,
    /// A validation rule rejected the simulation.
    ValidationFailed,
    /// Another simulation already holds the active slot.
    Conflict,
    /// Anything unanticipated, typically a store failure.
    Internal,
}

/// Errors returned by [`LifecycleController`](crate::LifecycleController)
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The referenced record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A validation rule failed; the message comes from the rule.
    #[error("{0}")]
    ValidationFailed(String),

    /// The active slot is held by a different simulation.
    #[error("{0}")]
    Conflict(String),

    /// An unexpected failure.
    #[error("{0}")]
    Internal(String),
}

impl LifecycleError {
    /// The classification of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<DbError> for LifecycleError {
    fn from(err: DbError) -> Self {
        if err.is_not_found() {
            Self::NotFound(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_not_found() {
        let err = LifecycleError::from(DbError::NotFound {
            entity: "simulation",
            id: 42,
        });
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "simulation 42 not found");
    }

    #[test]
    fn other_store_failures_are_internal() {
        let err = LifecycleError::from(DbError::Config(String::from("bad url")));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
