//! HTTP error taxonomy for the daemon.
//!
//! Validation problems are 400s and never logged as severe; auth
//! failures are 401s; unknown or inactive resources collapse into one
//! 404 so existence is never disclosed; persistence failures are
//! opaque 500s whose detail goes to the log, not the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid_body")]
    InvalidBody(&'static str),
    #[error("invalid_domain")]
    InvalidDomain(String),
    #[error("missing_site_param")]
    MissingSiteParam,
    #[error("invalid_credentials")]
    InvalidCredentials,
    #[error("unauthorized")]
    Unauthorized,
    #[error("not_found")]
    NotFound,
    #[error("email_taken")]
    EmailTaken,
    #[error("domain_taken")]
    DomainTaken,
    #[error("register_failed")]
    RegisterFailed,
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => ApiError::Database(e),
            StoreError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidBody(detail) => {
                (StatusCode::BAD_REQUEST, format!("invalid_body: {detail}"))
            }
            ApiError::InvalidDomain(_) => (StatusCode::BAD_REQUEST, "invalid_domain".to_string()),
            ApiError::MissingSiteParam => {
                (StatusCode::BAD_REQUEST, "missing_site_param".to_string())
            }
            ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials".to_string())
            }
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not_found".to_string()),
            ApiError::EmailTaken => (StatusCode::CONFLICT, "email_taken".to_string()),
            ApiError::DomainTaken => (StatusCode::CONFLICT, "domain_taken".to_string()),
            ApiError::RegisterFailed => {
                tracing::error!(error = %self, "Registration failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "register_failed".to_string(),
                )
            }
            ApiError::Database(_) | ApiError::Internal(_) => {
                tracing::error!(error = %self, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
