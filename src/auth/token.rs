//! Session token minting and verification.
//!
//! # Purpose
//! Defines the claim structure and helpers for signing and verifying the
//! bearer credentials issued at signin, self-describing their subject and
//! expiry so verification needs no store lookup.
//!
//! # Key invariants
//! - Tokens are always HS256; `iss` and `aud` are pinned and validated.
//! - The signing secret is mandatory configuration of at least
//!   [`MIN_SECRET_LEN`] bytes. There is no fallback value: a default secret
//!   would let any instance of the software forge tokens for any other, so
//!   [`TokenKeys::from_secret`] fails closed and startup aborts.
//! - Every token carries a fresh `jti`, so two signins in the same second
//!   still produce distinct credentials (and distinct registry rows).
//!
//! # Security boundary
//! The secret only exists inside [`TokenKeys`]; it is never logged and never
//! serialized.
use crate::model::{Role, UserAccount};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Issuer pinned into every session token.
pub const ISSUER: &str = "docket-auth";
/// Audience pinned into every session token.
pub const AUDIENCE: &str = "docket-api";
/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Claims carried by session tokens.
///
/// `sub` is the account id; `email` and `role` ride along so the gate can
/// resolve the caller's identity without a user lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Errors produced by token minting or verification.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("key error: {0}")]
    Key(String),
}

/// Signing and verification key material derived from the configured secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    /// Build key material from the configured secret.
    ///
    /// Fails when the secret is shorter than [`MIN_SECRET_LEN`] bytes; a
    /// short or empty secret must abort startup, never degrade to a default.
    pub fn from_secret(secret: &str) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::Key(format!(
                "signing secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.write_str("TokenKeys(..)")
    }
}

/// Mint a signed session token for an account.
pub fn mint_session_token(
    keys: &TokenKeys,
    user: &UserAccount,
    ttl: Duration,
) -> Result<String, TokenError> {
    let now = now_epoch_seconds();
    let claims = SessionClaims {
        iss: ISSUER.to_string(),
        aud: AUDIENCE.to_string(),
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp: now + ttl.as_secs() as i64,
    };
    Ok(jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &keys.encoding,
    )?)
}

/// Verify a session token's signature, issuer, audience, and expiry.
///
/// Registry membership is checked separately by the gate; this function only
/// answers whether the credential itself is genuine and unexpired.
pub fn verify_session_token(
    keys: &TokenKeys,
    token: &str,
    leeway: u64,
) -> Result<SessionClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUDIENCE]);
    validation.set_issuer(&[ISSUER]);
    validation.leeway = leeway;
    let decoded = jsonwebtoken::decode::<SessionClaims>(token, &keys.decoding, &validation)?;
    Ok(decoded.claims)
}

fn now_epoch_seconds() -> i64 {
    // Wall-clock time; verification leeway absorbs small skew. A clock before
    // the epoch clamps to zero instead of panicking.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const TEST_SECRET: &str = "unit-test-secret-0123456789abcdef0123456789";

    fn keys() -> TokenKeys {
        TokenKeys::from_secret(TEST_SECRET).expect("keys")
    }

    fn account() -> UserAccount {
        UserAccount {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            firstname: "Ann".to_string(),
            lastname: "Lee".to_string(),
            role: Role::Lawyer,
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn short_secret_is_rejected() {
        let err = TokenKeys::from_secret("too-short").err().expect("rejected");
        assert!(matches!(err, TokenError::Key(_)));
    }

    #[test]
    fn mint_and_verify_round_trips_identity_claims() {
        let keys = keys();
        let user = account();
        let token =
            mint_session_token(&keys, &user, Duration::from_secs(3600)).expect("mint");
        let claims = verify_session_token(&keys, &token, 5).expect("verify");
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, Role::Lawyer);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tokens_are_unique_per_mint() {
        let keys = keys();
        let user = account();
        let first =
            mint_session_token(&keys, &user, Duration::from_secs(3600)).expect("first");
        let second =
            mint_session_token(&keys, &user, Duration::from_secs(3600)).expect("second");
        assert_ne!(first, second);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = keys();
        let now = now_epoch_seconds();
        let claims = SessionClaims {
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            sub: Uuid::new_v4().to_string(),
            email: "a@x.com".to_string(),
            role: Role::User,
            jti: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .expect("encode");
        assert!(verify_session_token(&keys, &token, 5).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let keys = keys();
        let other =
            TokenKeys::from_secret("another-secret-0123456789abcdef01234567").expect("other");
        let token = mint_session_token(&other, &account(), Duration::from_secs(3600))
            .expect("mint");
        assert!(verify_session_token(&keys, &token, 5).is_err());
    }

    #[test]
    fn foreign_audience_is_rejected() {
        let keys = keys();
        let now = now_epoch_seconds();
        let claims = SessionClaims {
            iss: ISSUER.to_string(),
            aud: "some-other-service".to_string(),
            sub: Uuid::new_v4().to_string(),
            email: "a@x.com".to_string(),
            role: Role::User,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .expect("encode");
        assert!(verify_session_token(&keys, &token, 5).is_err());
    }
}
