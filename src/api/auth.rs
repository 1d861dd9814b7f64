//! Credential and session lifecycle handlers.
//!
//! # Purpose
//! Implements signup, signin, signout, the password reset flow, and the
//! identity echo endpoint. These handlers orchestrate the credential store,
//! token issuer, and session registry; per-request validation itself lives in
//! [`crate::auth::identity`].
use crate::api::error::{
    ApiError, api_duplicate_email, api_internal, api_internal_message, api_invalid_or_expired,
    api_not_found, api_unauthorized, api_validation_error,
};
use crate::api::types::{
    AuthResponse, ForgotPasswordRequest, ForgotPasswordResponse, MessageResponse,
    ResetPasswordRequest, SigninRequest, SignupRequest,
};
use crate::app::AppState;
use crate::auth::identity::{AuthIdentity, extract_bearer};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::mint_session_token;
use crate::model::{PasswordResetToken, Role, SessionRecord, UserAccount};
use crate::store::StoreError;
use anyhow::anyhow;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;
const RESET_TOKEN_BYTES: usize = 32;

#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created and session issued", body = AuthResponse),
        (status = 400, description = "Missing fields or duplicate email", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_signup(&body)?;
    let password_hash = hash_password(&body.password).map_err(|err| {
        tracing::error!(error = %err, "password hashing failed");
        api_internal_message("failed to process credentials")
    })?;
    let user = UserAccount {
        id: Uuid::new_v4(),
        email: body.email.trim().to_string(),
        password_hash,
        firstname: body.firstname.trim().to_string(),
        lastname: body.lastname.trim().to_string(),
        role: Role::User,
        is_active: true,
        created_at: Utc::now(),
        last_login: None,
    };
    let user = match state.store.create_user(user).await {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => {
            return Err(api_duplicate_email("email already registered"));
        }
        Err(err) => return Err(api_internal("failed to create account", &err)),
    };
    let token = issue_session(&state, &user).await?;
    metrics::counter!("docket_auth_signups_total").increment(1);
    tracing::info!(user_id = %user.id, "account created");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/signin",
    tag = "auth",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Session issued", body = AuthResponse),
        (status = 401, description = "Invalid credentials or inactive account", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn signin(
    State(state): State<AppState>,
    Json(body): Json<SigninRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state
        .store
        .user_by_email(body.email.trim())
        .await
        .map_err(|err| api_internal("failed to look up account", &err))?;
    let Some(user) = user else {
        metrics::counter!("docket_auth_signin_failures_total").increment(1);
        return Err(api_unauthorized("invalid credentials"));
    };
    if !user.is_active {
        metrics::counter!("docket_auth_signin_failures_total").increment(1);
        return Err(api_unauthorized("account is inactive"));
    }
    if !verify_password(&user.password_hash, &body.password) {
        metrics::counter!("docket_auth_signin_failures_total").increment(1);
        return Err(api_unauthorized("invalid credentials"));
    }
    // The timestamp touch is the only write on the success path.
    state
        .store
        .touch_last_login(user.id, Utc::now())
        .await
        .map_err(|err| api_internal("failed to update last login", &err))?;
    let token = issue_session(&state, &user).await?;
    metrics::counter!("docket_auth_signins_total").increment(1);
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/signout",
    tag = "auth",
    responses(
        (status = 200, description = "Session revoked; idempotent", body = MessageResponse),
        (status = 401, description = "No bearer token presented", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn signout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    // Revocation is an exact-match delete; the token does not need to
    // verify. Signing out an already-expired or already-revoked credential
    // succeeds with nothing to do, so retries are safe.
    let bearer =
        extract_bearer(&headers).ok_or_else(|| api_unauthorized("missing bearer token"))?;
    let removed = state
        .store
        .revoke_session(bearer)
        .await
        .map_err(|err| api_internal("failed to revoke session", &err))?;
    tracing::debug!(removed, "signout");
    Ok(Json(MessageResponse {
        message: "signed out".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset token issued", body = ForgotPasswordResponse),
        (status = 404, description = "No account with that email", body = crate::api::types::ErrorResponse)
    )
)]
/// Issue a single-use, one-hour reset token.
///
/// Returns 404 when no account matches, which discloses account existence to
/// the caller. The token itself is echoed in the response only in development
/// mode; delivery is otherwise out of scope for this service.
pub(crate) async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, ApiError> {
    let user = state
        .store
        .user_by_email(body.email.trim())
        .await
        .map_err(|err| api_internal("failed to look up account", &err))?
        .ok_or_else(|| api_not_found("no account with that email"))?;

    let token = generate_reset_token().map_err(|err| {
        tracing::error!(error = %err, "reset token generation failed");
        api_internal_message("failed to issue reset token")
    })?;
    let now = Utc::now();
    let expires_at = now
        + chrono::Duration::from_std(state.reset_ttl)
            .map_err(|_| api_internal_message("reset ttl out of range"))?;
    state
        .store
        .create_reset_token(PasswordResetToken {
            id: Uuid::new_v4(),
            user_id: user.id,
            token: token.clone(),
            expires_at,
            created_at: now,
        })
        .await
        .map_err(|err| api_internal("failed to store reset token", &err))?;
    metrics::counter!("docket_auth_reset_requests_total").increment(1);
    tracing::info!(user_id = %user.id, "password reset requested");

    let echoed = if state.dev_mode { Some(token) } else { None };
    Ok(Json(ForgotPasswordResponse {
        message: "password reset token issued".to_string(),
        token: echoed,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated, all sessions revoked", body = MessageResponse),
        (status = 400, description = "Invalid or expired reset token", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if body.token.trim().is_empty() {
        return Err(api_validation_error("missing required field: token"));
    }
    if body.new_password.len() < MIN_PASSWORD_LEN {
        return Err(api_validation_error(
            "password must be at least 8 characters",
        ));
    }
    // Consumption is one atomic conditional delete in the store; a second
    // caller racing on the same token gets None here, never a double reset.
    let consumed = state
        .store
        .consume_reset_token(body.token.trim(), Utc::now())
        .await
        .map_err(|err| api_internal("failed to consume reset token", &err))?;
    let Some(reset) = consumed else {
        return Err(api_invalid_or_expired("invalid or expired reset token"));
    };

    let password_hash = hash_password(&body.new_password).map_err(|err| {
        tracing::error!(error = %err, "password hashing failed");
        api_internal_message("failed to process credentials")
    })?;
    match state
        .store
        .update_password_hash(reset.user_id, &password_hash)
        .await
    {
        Ok(()) => {}
        // The account vanished between issuance and consumption; to the
        // caller that is the same stale-token outcome.
        Err(StoreError::NotFound(_)) => {
            return Err(api_invalid_or_expired("invalid or expired reset token"));
        }
        Err(err) => return Err(api_internal("failed to update password", &err)),
    }

    // A password change invalidates every outstanding credential for the
    // account; the registry is the revocation authority.
    let revoked = state
        .store
        .revoke_user_sessions(reset.user_id)
        .await
        .map_err(|err| api_internal("failed to revoke sessions", &err))?;
    metrics::counter!("docket_auth_resets_total").increment(1);
    tracing::info!(user_id = %reset.user_id, revoked_sessions = revoked, "password reset completed");
    Ok(Json(MessageResponse {
        message: "password updated".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "The caller's account", body = crate::model::UserProfile),
        (status = 401, description = "Missing, invalid, or revoked credential", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn me(
    State(state): State<AppState>,
    identity: AuthIdentity,
) -> Result<Json<crate::model::UserProfile>, ApiError> {
    let user = state
        .store
        .user_by_id(identity.user_id)
        .await
        .map_err(|err| api_internal("failed to look up account", &err))?
        .ok_or_else(|| api_not_found("account not found"))?;
    Ok(Json(user.into()))
}

/// Mint a session token and persist its registry row.
///
/// The two writes are not one transaction: a crash in between leaves an
/// account without a session, which the next signin repairs.
pub(crate) async fn issue_session(
    state: &AppState,
    user: &UserAccount,
) -> Result<String, ApiError> {
    let token = mint_session_token(&state.token_keys, user, state.session_ttl).map_err(|err| {
        tracing::error!(error = %err, "token minting failed");
        api_internal_message("failed to issue session token")
    })?;
    let now = Utc::now();
    let expires_at = now
        + chrono::Duration::from_std(state.session_ttl)
            .map_err(|_| api_internal_message("session ttl out of range"))?;
    state
        .store
        .record_session(SessionRecord {
            id: Uuid::new_v4(),
            user_id: user.id,
            token: token.clone(),
            expires_at,
            created_at: now,
        })
        .await
        .map_err(|err| api_internal("failed to record session", &err))?;
    Ok(token)
}

fn validate_signup(body: &SignupRequest) -> Result<(), ApiError> {
    let required = [
        ("email", &body.email),
        ("password", &body.password),
        ("firstname", &body.firstname),
        ("lastname", &body.lastname),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(api_validation_error(&format!(
                "missing required field: {field}"
            )));
        }
    }
    if !body.email.contains('@') {
        return Err(api_validation_error("email is not valid"));
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(api_validation_error(
            "password must be at least 8 characters",
        ));
    }
    Ok(())
}

fn generate_reset_token() -> anyhow::Result<String> {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    getrandom::getrandom(&mut bytes).map_err(|err| anyhow!("token generation: {err}"))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
