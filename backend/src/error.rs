//! Error handling for the PropMaster platform
//!
//! Every failure leaves the server as `{ "error": { code, message, field? } }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::access::AccessDenied;
use thiserror::Error;
use validator::ValidationErrors;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid signature")]
    InvalidSignature,

    // Authorization errors
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("No longer available: {0}")]
    Gone(String),

    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<AccessDenied> for AppError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::Unauthenticated => AppError::Unauthenticated,
            AccessDenied::Forbidden { role, capability } => {
                tracing::warn!(%role, %capability, "Request denied by route guard");
                AppError::InsufficientPermissions
            }
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        match shared::validation::first_violation(&errors) {
            Some((field, message)) => AppError::Validation { field, message },
            None => AppError::ValidationError(errors.to_string()),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated | AppError::InvalidToken(_) | AppError::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
            AppError::InsufficientPermissions | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation { .. } | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Gone(_) => StatusCode::GONE,
            AppError::LimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::DatabaseError(_) | AppError::Internal(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn detail(&self) -> ErrorDetail {
        match self {
            AppError::Unauthenticated => {
                ErrorDetail::new("UNAUTHORIZED", "Authentication required. Please sign in.")
            }
            AppError::InvalidToken(_) => ErrorDetail::new("INVALID_TOKEN", "Invalid or expired session"),
            AppError::InvalidSignature => ErrorDetail::new("INVALID_SIGNATURE", "Invalid signature"),
            AppError::InsufficientPermissions => ErrorDetail::new(
                "INSUFFICIENT_PERMISSIONS",
                "You do not have permission to perform this action",
            ),
            AppError::Forbidden(msg) => ErrorDetail::new("FORBIDDEN", msg.clone()),
            AppError::Validation { field, message } => ErrorDetail {
                field: Some(field.clone()),
                ..ErrorDetail::new("VALIDATION_ERROR", message.clone())
            },
            AppError::ValidationError(msg) => ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => ErrorDetail::new("CONFLICT", msg.clone()),
            AppError::NotFound(resource) => {
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource))
            }
            AppError::Gone(msg) => ErrorDetail::new("GONE", msg.clone()),
            AppError::LimitExceeded(msg) => ErrorDetail::new("LIMIT_EXCEEDED", msg.clone()),
            AppError::DatabaseError(_) => ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            AppError::Internal(msg) => ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            AppError::InternalError(_) => {
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: self.detail() })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared::access::{Capability, Role};

    #[test]
    fn test_guard_denials_map_to_401_and_403() {
        let unauthenticated: AppError = AccessDenied::Unauthenticated.into();
        assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);

        let forbidden: AppError = AccessDenied::Forbidden {
            role: Role::Viewer,
            capability: Capability::ManageUsers,
        }
        .into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_validation_errors_keep_field() {
        let mut errors = ValidationErrors::new();
        let mut err = validator::ValidationError::new("length");
        err.message = Some("Client name is required".into());
        errors.add("client_name", err);

        match AppError::from(errors) {
            AppError::Validation { field, message } => {
                assert_eq!(field, "client_name");
                assert_eq!(message, "Client name is required");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_not_found_status() {
        assert_eq!(AppError::NotFound("Property".into()).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_closed_link_statuses() {
        assert_eq!(AppError::Gone("expired".into()).status(), StatusCode::GONE);
        assert_eq!(
            AppError::LimitExceeded("views".into()).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
