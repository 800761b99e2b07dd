//! API error types and handling

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use widgetgate_shared::StoreError;

/// Hide internal error messages from clients (set once at startup)
static REDACT_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

/// Replace 5xx messages with a generic one. Enabled in production.
pub fn set_redact_internal_errors(enabled: bool) {
    REDACT_INTERNAL_ERRORS.store(enabled, Ordering::Relaxed);
}

const GENERIC_INTERNAL_MESSAGE: &str =
    "An internal server error occurred. Please try again later.";

/// One rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Validation errors
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),

    // Admission errors
    #[error("Not allowed by CORS")]
    OriginNotAllowed,
    #[error("{0}")]
    TooManyRequests(String),

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    // Internal errors
    #[error("Failed to {0}")]
    Store(&'static str, #[source] StoreError),
    #[error("Internal server error")]
    Internal,
    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::OriginNotAllowed => StatusCode::FORBIDDEN,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(..) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::OriginNotAllowed => "CORS_REJECTED",
            ApiError::TooManyRequests(_) => "RATE_LIMITED",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::Store(..) => "STORE_ERROR",
            ApiError::Internal => "INTERNAL_ERROR",
            ApiError::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "Rejected request body");
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            match &self {
                ApiError::Store(_, source) => {
                    tracing::error!(error = %source, "{}", self)
                }
                _ => tracing::error!("{}", self),
            }
        }

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR
            && REDACT_INTERNAL_ERRORS.load(Ordering::Relaxed)
        {
            GENERIC_INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        let body = match &self {
            ApiError::Validation(details) => json!({
                "error": message,
                "code": self.code(),
                "details": details,
            }),
            _ => json!({
                "error": message,
                "code": self.code(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_lists_fields() {
        let (status, body) = body_json(ApiError::Validation(vec![FieldError::new(
            "primaryColor",
            "primaryColor must be a valid hex color",
        )]))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["details"][0]["field"], "primaryColor");
    }

    #[tokio::test]
    async fn test_rate_limited_uses_class_message() {
        let (status, body) =
            body_json(ApiError::TooManyRequests("Too many chat requests".to_string())).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Too many chat requests");
    }

    #[tokio::test]
    async fn test_store_error_message() {
        let (status, body) = body_json(ApiError::Store(
            "update widget config",
            StoreError::Database("boom".to_string()),
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to update widget config");
    }
}
