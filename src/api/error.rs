//! API error types and helpers.
//!
//! # Purpose
//! Centralizes HTTP error response construction so every endpoint returns the
//! same shape: a stable `code` plus a human-readable `message`.
//!
//! # Security considerations
//! This module is the redaction boundary. Store and hashing failures are
//! logged server-side with full detail and surface to callers only as the
//! taxonomy-level code and message; raw diagnostics never leave the process.
use crate::api::types::ErrorResponse;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error returned by handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn build(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

/// 400 with code `validation_error`: malformed or missing input.
pub fn api_validation_error(message: &str) -> ApiError {
    build(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// 400 with code `duplicate_email`: the email is already registered.
pub fn api_duplicate_email(message: &str) -> ApiError {
    build(StatusCode::BAD_REQUEST, "duplicate_email", message)
}

/// 400 with code `invalid_or_expired_token`: reset token rejected.
pub fn api_invalid_or_expired(message: &str) -> ApiError {
    build(
        StatusCode::BAD_REQUEST,
        "invalid_or_expired_token",
        message,
    )
}

/// 401 with code `unauthorized`: authentication failed or missing.
pub fn api_unauthorized(message: &str) -> ApiError {
    build(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

/// 403 with code `forbidden`: authenticated but insufficient role.
pub fn api_forbidden(message: &str) -> ApiError {
    build(StatusCode::FORBIDDEN, "forbidden", message)
}

/// 404 with code `not_found`.
pub fn api_not_found(message: &str) -> ApiError {
    build(StatusCode::NOT_FOUND, "not_found", message)
}

/// 500 from a store error. Logs the store detail server-side; the caller
/// sees only the generic message.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "auth storage error");
    build(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// 500 without a concrete store error to log.
pub fn api_internal_message(message: &str) -> ApiError {
    build(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}
