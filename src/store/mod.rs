//! Storage backends for credentials, sessions, and reset tokens.
//!
//! # Purpose
//! Defines the [`AuthStore`] trait implemented by the in-memory and Postgres
//! backends, plus the error type handlers translate into HTTP responses.
//!
//! # Notes
//! Neither backend sweeps expired session or reset rows; rows persist until
//! replaced by new activity or cleaned externally. Validation never trusts a
//! session row without independently checking the credential's embedded
//! expiry, so a stale row grants nothing.
use crate::model::{PasswordResetToken, Role, SessionRecord, UserAccount};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Insert a new account. Fails with [`StoreError::Conflict`] when the
    /// email is already registered, case-insensitively, active or not.
    async fn create_user(&self, user: UserAccount) -> StoreResult<UserAccount>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<UserAccount>>;
    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<UserAccount>>;
    async fn list_users(&self) -> StoreResult<Vec<UserAccount>>;
    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;
    async fn update_profile(
        &self,
        id: Uuid,
        firstname: &str,
        lastname: &str,
    ) -> StoreResult<UserAccount>;
    async fn set_role(&self, id: Uuid, role: Role) -> StoreResult<UserAccount>;
    async fn set_active(&self, id: Uuid, is_active: bool) -> StoreResult<UserAccount>;

    async fn record_session(&self, session: SessionRecord) -> StoreResult<()>;
    async fn session_exists(&self, token: &str) -> StoreResult<bool>;
    /// Delete the session row matching `token` exactly. Idempotent: returns
    /// the number of rows removed, zero meaning nothing to do.
    async fn revoke_session(&self, token: &str) -> StoreResult<u64>;
    /// Delete every session row for a user. Used by password reset and
    /// account deactivation so outstanding credentials die immediately.
    async fn revoke_user_sessions(&self, user_id: Uuid) -> StoreResult<u64>;

    async fn create_reset_token(&self, token: PasswordResetToken) -> StoreResult<()>;
    /// Consume a reset token: delete and return the row only when it matches
    /// `token` exactly and has not expired at `now`, as one atomic step.
    /// Expired rows are left in place. At most one concurrent caller can
    /// receive `Some` for a given token.
    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<PasswordResetToken>>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
