//! OpenAPI schema aggregation for the auth API.
//!
//! # Purpose
//! Collects all routes and payload types into a single OpenAPI document for
//! docs and client generation.
use crate::api::{
    auth, system,
    types::{
        ActiveUpdateRequest, AuthResponse, ErrorResponse, ForgotPasswordRequest,
        ForgotPasswordResponse, HealthStatus, MessageResponse, ProfileUpdateRequest,
        ResetPasswordRequest, RoleUpdateRequest, SigninRequest, SignupRequest, UserListResponse,
    },
    users,
};
use crate::model::{Role, UserProfile};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "docket-auth",
        version = "v1",
        description = "Credential issuance and session lifecycle API for the Docket platform"
    ),
    paths(
        auth::signup,
        auth::signin,
        auth::signout,
        auth::forgot_password,
        auth::reset_password,
        auth::me,
        users::list_users,
        users::set_role,
        users::set_active,
        users::update_profile,
        system::system_health,
    ),
    components(schemas(
        ActiveUpdateRequest,
        AuthResponse,
        ErrorResponse,
        ForgotPasswordRequest,
        ForgotPasswordResponse,
        HealthStatus,
        MessageResponse,
        ProfileUpdateRequest,
        ResetPasswordRequest,
        Role,
        RoleUpdateRequest,
        SigninRequest,
        SignupRequest,
        UserListResponse,
        UserProfile,
    ))
)]
pub struct ApiDoc;
