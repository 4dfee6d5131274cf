//! API error types
//!
//! Every error renders as `{"error": "<message>"}` with a matching status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use proctor::{EnrollmentError, ProctorError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Body missing, not JSON, or lacking required fields (400)
    #[error("Invalid payload")]
    InvalidPayload,

    /// Image could not be decoded (400)
    #[error("Invalid image")]
    InvalidImage,

    /// Request understood but refused, message is client-facing (400)
    #[error("{0}")]
    Rejected(String),

    /// Metrics recorder not installed (503)
    #[error("Metrics unavailable")]
    MetricsUnavailable,

    /// Internal server error (500)
    #[error("Internal error")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload | ApiError::InvalidImage | ApiError::Rejected(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::MetricsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProctorError> for ApiError {
    fn from(err: ProctorError) -> Self {
        match err {
            ProctorError::Decode(_) => ApiError::InvalidImage,
            ProctorError::Task(message) => ApiError::Internal(message),
        }
    }
}

impl From<EnrollmentError> for ApiError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::Decode(_) => ApiError::InvalidImage,
            err if err.is_rejection() => ApiError::Rejected(err.to_string()),
            err => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!("Request failed: {}", detail);
        }
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
