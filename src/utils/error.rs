use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// A single schema violation found while validating an inbound payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Per-request outcome taxonomy. Nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed ({} violation(s))", .0.len())]
    Validation(Vec<Violation>),

    #[error("authentication required: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("user is already a member of this club")]
    AlreadyMember,

    #[error("user is not a member of this club")]
    NotAMember,

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("not applicable: {0}")]
    NotApplicable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::AlreadyMember => "ALREADY_MEMBER",
            AppError::NotAMember => "NOT_A_MEMBER",
            AppError::InvalidOperation(_) => "INVALID_OPERATION",
            AppError::NotApplicable(_) => "NOT_APPLICABLE",
            AppError::Store(_) => "STORE_ERROR",
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![Violation::new(field, message)])
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::InvalidOperation(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::NotAMember => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) | AppError::AlreadyMember => StatusCode::CONFLICT,
            AppError::NotApplicable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Store(e) => {
                log::error!("❌ Store failure: {}", e);
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = serde_json::json!({
            "success": false,
            "error": message,
            "code": self.code(),
        });
        if let AppError::Validation(violations) = self {
            body["violations"] = serde_json::json!(violations);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_distinguishes_login_from_not_allowed() {
        assert_eq!(
            AppError::Unauthorized("missing token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("not a member".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::AlreadyMember.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::NotApplicable("no dues".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_validation_message_counts_violations() {
        let err = AppError::Validation(vec![
            Violation::new("title", "too short"),
            Violation::new("content", "too short"),
        ]);
        assert_eq!(err.to_string(), "validation failed (2 violation(s))");
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
