//! Account administration handlers.
//!
//! # Purpose
//! The minimal management surface over the credential store: listing
//! accounts, role changes, active/inactive toggles (the deletion-equivalent),
//! and profile edits. Role and active changes are admin-only; profile edits
//! allow self or admin.
use crate::api::error::{ApiError, api_internal, api_not_found};
use crate::api::types::{
    ActiveUpdateRequest, ProfileUpdateRequest, RoleUpdateRequest, UserListResponse,
};
use crate::app::AppState;
use crate::auth::identity::{AuthIdentity, require_admin, require_self_or_admin};
use crate::model::UserProfile;
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses(
        (status = 200, description = "All accounts", body = UserListResponse),
        (status = 403, description = "Caller is not an admin", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    identity: AuthIdentity,
) -> Result<Json<UserListResponse>, ApiError> {
    require_admin(&identity)?;
    let items = state
        .store
        .list_users()
        .await
        .map_err(|err| api_internal("failed to list accounts", &err))?;
    Ok(Json(UserListResponse {
        items: items.into_iter().map(UserProfile::from).collect(),
    }))
}

#[utoipa::path(
    patch,
    path = "/users/{user_id}/role",
    tag = "users",
    params(("user_id" = Uuid, Path, description = "Account identifier")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Role updated", body = UserProfile),
        (status = 403, description = "Caller is not an admin", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Account not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn set_role(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Path(user_id): Path<Uuid>,
    Json(body): Json<RoleUpdateRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    require_admin(&identity)?;
    match state.store.set_role(user_id, body.role).await {
        Ok(user) => {
            tracing::info!(user_id = %user_id, role = %body.role, admin = %identity.user_id, "role changed");
            Ok(Json(user.into()))
        }
        Err(StoreError::NotFound(_)) => Err(api_not_found("account not found")),
        Err(err) => Err(api_internal("failed to update role", &err)),
    }
}

#[utoipa::path(
    patch,
    path = "/users/{user_id}/active",
    tag = "users",
    params(("user_id" = Uuid, Path, description = "Account identifier")),
    request_body = ActiveUpdateRequest,
    responses(
        (status = 200, description = "Active flag updated", body = UserProfile),
        (status = 403, description = "Caller is not an admin", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Account not found", body = crate::api::types::ErrorResponse)
    )
)]
/// Toggle an account's active flag. Deactivation revokes every session for
/// the account so outstanding credentials die on their next request.
pub(crate) async fn set_active(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Path(user_id): Path<Uuid>,
    Json(body): Json<ActiveUpdateRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    require_admin(&identity)?;
    let user = match state.store.set_active(user_id, body.is_active).await {
        Ok(user) => user,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("account not found")),
        Err(err) => return Err(api_internal("failed to update account", &err)),
    };
    if !body.is_active {
        let revoked = state
            .store
            .revoke_user_sessions(user_id)
            .await
            .map_err(|err| api_internal("failed to revoke sessions", &err))?;
        tracing::info!(user_id = %user_id, revoked_sessions = revoked, "account deactivated");
    }
    Ok(Json(user.into()))
}

#[utoipa::path(
    patch,
    path = "/users/{user_id}",
    tag = "users",
    params(("user_id" = Uuid, Path, description = "Account identifier")),
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 403, description = "Not the caller's account and caller is not an admin", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Account not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_profile(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Path(user_id): Path<Uuid>,
    Json(body): Json<ProfileUpdateRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    require_self_or_admin(&identity, user_id)?;
    match state
        .store
        .update_profile(user_id, body.firstname.trim(), body.lastname.trim())
        .await
    {
        Ok(user) => Ok(Json(user.into())),
        Err(StoreError::NotFound(_)) => Err(api_not_found("account not found")),
        Err(err) => Err(api_internal("failed to update profile", &err)),
    }
}
