use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::core::store::StoreError;
use crate::security::auth_api::AuthError;
use crate::security::validation::ValidationResult;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Constraint(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::Constraint(_) => StatusCode::CONFLICT,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Auth(e) => e.status_code(),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "unique_violation",
            Self::Constraint(_) => "constraint_violation",
            Self::Forbidden(_) => "forbidden",
            Self::Auth(e) => e.error_code(),
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Auth(e) => e.message(),
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(label) => Self::NotFound(label),
            StoreError::UniqueViolation(msg) => Self::Conflict(msg),
            StoreError::ForeignKeyViolation(msg) => Self::Constraint(msg),
            StoreError::CheckViolation(msg) => Self::Validation(msg),
            StoreError::Connection(msg) | StoreError::Query(msg) => {
                log::error!("Store failure: {}", msg);
                Self::Internal(msg)
            }
        }
    }
}

impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        Self::Validation(result.summary())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.error_code(),
            "message": self.message()
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(StoreError::NotFound("Company")).status_code(),
            StatusCode::NOT_FOUND
        );
        let conflict = ApiError::from(StoreError::UniqueViolation("dup".into()));
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(conflict.error_code(), "unique_violation");

        let restrict = ApiError::from(StoreError::ForeignKeyViolation("in use".into()));
        assert_eq!(restrict.status_code(), StatusCode::CONFLICT);
        assert_eq!(restrict.error_code(), "constraint_violation");

        let internal = ApiError::from(StoreError::Query("syntax error at or near".into()));
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.message(), "An internal error occurred");
    }

    #[test]
    fn test_auth_errors_pass_through() {
        let err = ApiError::from(AuthError::ExpiredToken);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_code(), "expired_token");
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(ApiError::NotFound("Deal").message(), "Deal not found");
    }
}
