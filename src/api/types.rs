//! HTTP API request/response types.
//!
//! # Purpose
//! Defines the payload shapes for the auth and account-administration
//! endpoints, shared with OpenAPI schema generation.
use crate::model::{Role, UserProfile};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Clone)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
}

#[derive(Debug, Deserialize, ToSchema, Clone)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Issued on signup and signin: the bearer credential plus the account it
/// authenticates.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize, ToSchema, Clone)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// The reset acknowledgement. `token` is populated only when the server runs
/// in development mode; production deployments deliver the token out of band.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ForgotPasswordResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Clone)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub items: Vec<UserProfile>,
}

#[derive(Debug, Deserialize, ToSchema, Clone)]
pub struct RoleUpdateRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema, Clone)]
pub struct ActiveUpdateRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize, ToSchema, Clone)]
pub struct ProfileUpdateRequest {
    pub firstname: String,
    pub lastname: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
}
