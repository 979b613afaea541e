//! Error types for the simctl API server.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Every
//! error body has the shape `{"error": <message>, "status": <code>}`.

use std::fmt::Display;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use simctl_core::validation::ValidationError;
use simctl_core::{ErrorKind, LifecycleError};
use simctl_db::DbError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("{0}")]
    NotFound(String),

    /// The request was malformed or failed validation.
    #[error("{0}")]
    BadRequest(String),

    /// The request conflicts with the current lifecycle state.
    #[error("{0}")]
    Conflict(String),

    /// An internal error occurred.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Wrap a lifecycle failure for operation `op` on simulation `id`.
    ///
    /// The message reads `Failed to <op> simulation <id>: <reason>`.
    pub fn lifecycle(op: &str, id: impl Display, err: &LifecycleError) -> Self {
        let message = format!("Failed to {op} simulation {id}: {err}");
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::ValidationFailed => Self::BadRequest(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::Internal => Self::Internal(message),
        }
    }

    /// Wrap a validation failure for operation `op` on a simulation.
    pub fn validation(op: &str, err: ValidationError) -> Self {
        match err {
            ValidationError::Rejected { message, .. } => {
                Self::BadRequest(format!("Failed to {op} simulation: {message}"))
            }
            ValidationError::Store(db) => Self::from(db),
        }
    }

    /// The HTTP status this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        if err.is_not_found() {
            Self::NotFound(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::BadRequest(format!("invalid request: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
