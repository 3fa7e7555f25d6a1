//! Unified error handling for Patio Core

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Too many requests, retry in {seconds_until_next_attempt}s")]
    TooManyRequests { seconds_until_next_attempt: u64 },

    #[error("Verification code expired")]
    CodeExpired,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Upstream unavailable during {operation}")]
    UpstreamUnavailable {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    detail: String,
    #[serde(
        rename = "secondsUntilNextAttempt",
        skip_serializing_if = "Option::is_none"
    )]
    seconds_until_next_attempt: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, detail, retry_after) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone(), None)
            }
            AppError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation",
                msg.clone(),
                None,
            ),
            AppError::TooManyRequests {
                seconds_until_next_attempt,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                "too_many_requests",
                "Too many attempts, please wait before retrying".to_string(),
                Some(*seconds_until_next_attempt),
            ),
            AppError::CodeExpired => (
                StatusCode::BAD_REQUEST,
                "code_expired",
                "Verification code has expired, request a new one".to_string(),
                None,
            ),
            AppError::InvalidCode => (
                StatusCode::BAD_REQUEST,
                "invalid_code",
                "Verification code is incorrect".to_string(),
                None,
            ),
            AppError::UpstreamUnavailable { operation, source } => {
                tracing::error!(operation = %operation, error = ?source, "Upstream unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "upstream_unavailable",
                    "A required service is temporarily unavailable".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorBody {
            error: error_type.to_string(),
            detail,
            seconds_until_next_attempt: retry_after,
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

// Conversion from validation errors
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}
