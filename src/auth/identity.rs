//! Bearer-token gate and role guards.
//!
//! # Purpose
//! [`AuthIdentity`] is the extractor every protected handler takes; it runs
//! before any handler logic and is the single integration point the resource
//! routers consume. Extraction fails with 401 before a handler ever sees the
//! request.
//!
//! # Validation order
//! 1. A bearer token must be presented.
//! 2. Its signature, issuer, audience, and embedded expiry must verify. The
//!    expiry check never consults the registry, so an expired credential is
//!    dead even while its registry row lingers.
//! 3. Its registry row must still exist. The registry is the revocation
//!    authority: sign-out, password reset, and deactivation delete rows, and
//!    the deleted credential fails here on its next use.
use crate::api::error::{ApiError, api_forbidden, api_internal, api_unauthorized};
use crate::app::AppState;
use crate::auth::token::verify_session_token;
use crate::model::Role;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use uuid::Uuid;

/// Allowed clock skew when validating token expiry, in seconds.
const TOKEN_LEEWAY_SECS: u64 = 5;

/// The caller's resolved identity, attached to the request by the gate.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    /// The presented credential, kept for exact-match revocation at signout.
    pub token: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = extract_bearer(&parts.headers)
            .ok_or_else(|| api_unauthorized("missing bearer token"))?;
        let claims = verify_session_token(&state.token_keys, bearer, TOKEN_LEEWAY_SECS)
            .map_err(|_| api_unauthorized("invalid token"))?;
        let registered = state
            .store
            .session_exists(bearer)
            .await
            .map_err(|err| api_internal("failed to check session registry", &err))?;
        if !registered {
            return Err(api_unauthorized("session revoked"));
        }
        let user_id = claims
            .sub
            .parse()
            .map_err(|_| api_unauthorized("invalid token"))?;
        Ok(AuthIdentity {
            user_id,
            email: claims.email,
            role: claims.role,
            token: bearer.to_string(),
        })
    }
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?;
    let value = value.to_str().ok()?;
    value.strip_prefix("Bearer ")
}

/// Reject callers without the admin role.
pub fn require_admin(identity: &AuthIdentity) -> Result<(), ApiError> {
    if identity.role != Role::Admin {
        return Err(api_forbidden("admin role required"));
    }
    Ok(())
}

/// Allow a caller to act on their own account, or an admin on any account.
pub fn require_self_or_admin(identity: &AuthIdentity, target: Uuid) -> Result<(), ApiError> {
    if identity.user_id != target && identity.role != Role::Admin {
        return Err(api_forbidden("not your account"));
    }
    Ok(())
}
