//! API error types with HTTP response mapping.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use events::EventError;
use serde::Serialize;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub errors: Vec<String>,
}

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The request body is not valid JSON for the endpoint.
    MalformedInput,
    /// Bad request from the client.
    BadRequest(String),
    /// The request failed validation; holds the offending field identifiers.
    Validation(Vec<String>),
    /// Resource not found.
    NotFound(String),
    /// Internal server error. The message is logged, never returned.
    Internal(String),
}

impl ApiError {
    fn status_and_errors(self) -> (StatusCode, Vec<String>) {
        match self {
            ApiError::MalformedInput => {
                (StatusCode::BAD_REQUEST, vec!["Cannot parse JSON".to_string()])
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, vec![msg]),
            ApiError::Validation(fields) => (StatusCode::BAD_REQUEST, fields),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, vec![msg]),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    vec!["Internal server error".to_string()],
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, errors) = self.status_and_errors();
        let body = ErrorBody {
            code: status.as_u16(),
            errors,
        };
        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(fields) => ApiError::Validation(fields),
            DomainError::NotFound(_) => ApiError::NotFound("Order not found".to_string()),
            DomainError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<EventError> for ApiError {
    fn from(err: EventError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected request body");
        ApiError::MalformedInput
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected path parameter");
        ApiError::BadRequest("Invalid order ID".to_string())
    }
}
