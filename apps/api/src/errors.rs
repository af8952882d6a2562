use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::provider::AuthError;
use crate::auth::session::SessionError;
use crate::billing::gateway::PaymentError;
use crate::cv::document::DocumentError;
use crate::persistence::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl From<DocumentError> for AppError {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::EntryNotFound { .. } => AppError::NotFound(e.to_string()),
            DocumentError::TemplateLocked(_) => AppError::Forbidden(e.to_string()),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotSignedIn => AppError::Unauthorized,
            SessionError::Store(store) => AppError::Store(store),
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::Store(StoreError::Connectivity(msg)) => {
                tracing::warn!("Store unreachable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    "The document store is unreachable".to_string(),
                )
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Auth(AuthError::Rejected(msg)) => {
                (StatusCode::BAD_REQUEST, "AUTH_REJECTED", msg.clone())
            }
            AppError::Auth(AuthError::Connectivity(msg)) => {
                tracing::warn!("Auth provider unreachable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "AUTH_UNAVAILABLE",
                    "The sign-in service is unreachable".to_string(),
                )
            }
            AppError::Auth(e @ AuthError::Unexpected(_)) => {
                tracing::error!("Auth error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "AUTH_ERROR",
                    "The sign-in service returned an unexpected response".to_string(),
                )
            }
            AppError::Payment(e @ PaymentError::UnknownPlan(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_PLAN", e.to_string())
            }
            AppError::Payment(e @ PaymentError::UnknownSubscription(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
