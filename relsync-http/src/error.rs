//! Boundary rejections and their JSON rendering.
//!
//! Operation outcomes (denied checks, failed writes) are not errors here;
//! they travel in the endpoint's own result body.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};

/// A field-level validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub code: String,
}

/// Errors returned by the boundary before an operation runs.
///
/// Every variant renders as a JSON body of the form `{ "error": message }`;
/// validation failures add a `details` array of [`FieldError`]s.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or invalid identity.
    Unauthorized(String),
    /// Identity present but not privileged.
    Forbidden(String),
    /// Malformed request body.
    BadRequest(String),
    Validation(Vec<FieldError>),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            ApiError::Validation(errors) => write!(f, "Validation Error: {} errors", errors.len()),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => serde_json::json!({
                "error": "Validation failed",
                "details": errors,
            }),
            ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::BadRequest(msg) => serde_json::json!({ "error": msg }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        let errors = report
            .iter()
            .map(|(path, error)| {
                let field = path.to_string();
                FieldError {
                    field: if field.is_empty() { "value".to_string() } else { field },
                    message: error.message().to_string(),
                    code: "validation".to_string(),
                }
            })
            .collect();
        ApiError::Validation(errors)
    }
}
