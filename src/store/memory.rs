//! In-memory implementation of the auth store.
//!
//! # Purpose
//! Implements [`AuthStore`] entirely in memory using `HashMap`s guarded by
//! `tokio::sync::RwLock`. It exists for:
//! - local development and tests (no external dependencies)
//! - deployments where durability is not required
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: mutations take write locks, reads take
//!   read locks. Multiple instances have independent state.
//!
//! # Lock ordering
//! The email index lock is acquired before the users lock on paths that need
//! both. No path acquires them in the opposite order.
use super::{AuthStore, StoreError, StoreResult};
use crate::model::{PasswordResetToken, Role, SessionRecord, UserAccount};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory auth store.
///
/// Accounts are keyed by id with a lowercased-email index enforcing the
/// uniqueness invariant. Sessions and reset tokens are keyed by their token
/// string, matching the exact-match semantics of revocation and consumption.
pub struct InMemoryStore {
    users: Arc<RwLock<HashMap<Uuid, UserAccount>>>,
    /// Lowercased email -> account id. Guards the email uniqueness invariant.
    email_index: Arc<RwLock<HashMap<String, Uuid>>>,
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
    reset_tokens: Arc<RwLock<HashMap<String, PasswordResetToken>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            email_index: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            reset_tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthStore for InMemoryStore {
    async fn create_user(&self, user: UserAccount) -> StoreResult<UserAccount> {
        // The index write lock is held across both inserts so two concurrent
        // signups with the same email serialize on the uniqueness check.
        let mut index = self.email_index.write().await;
        let key = user.email.to_ascii_lowercase();
        if index.contains_key(&key) {
            return Err(StoreError::Conflict("email already registered".into()));
        }
        index.insert(key, user.id);
        self.users.write().await.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<UserAccount>> {
        let index = self.email_index.read().await;
        let Some(id) = index.get(&email.to_ascii_lowercase()).copied() else {
            return Ok(None);
        };
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<UserAccount>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<UserAccount>> {
        let users = self.users.read().await;
        let mut items: Vec<UserAccount> = users.values().cloned().collect();
        items.sort_by_key(|user| user.created_at);
        Ok(items)
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        user.last_login = Some(at);
        Ok(())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        firstname: &str,
        lastname: &str,
    ) -> StoreResult<UserAccount> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        user.firstname = firstname.to_string();
        user.lastname = lastname.to_string();
        Ok(user.clone())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> StoreResult<UserAccount> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        user.role = role;
        Ok(user.clone())
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> StoreResult<UserAccount> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        user.is_active = is_active;
        Ok(user.clone())
    }

    async fn record_session(&self, session: SessionRecord) -> StoreResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session);
        Ok(())
    }

    async fn session_exists(&self, token: &str) -> StoreResult<bool> {
        Ok(self.sessions.read().await.contains_key(token))
    }

    async fn revoke_session(&self, token: &str) -> StoreResult<u64> {
        let removed = self.sessions.write().await.remove(token);
        Ok(removed.map_or(0, |_| 1))
    }

    async fn revoke_user_sessions(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn create_reset_token(&self, token: PasswordResetToken) -> StoreResult<()> {
        self.reset_tokens
            .write()
            .await
            .insert(token.token.clone(), token);
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<PasswordResetToken>> {
        // Check and delete under one write lock so two concurrent consumers
        // of the same token cannot both succeed. Expired rows stay in place.
        let mut tokens = self.reset_tokens.write().await;
        let live = tokens
            .get(token)
            .is_some_and(|row| row.expires_at > now);
        if live {
            Ok(tokens.remove(token))
        } else {
            Ok(None)
        }
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account(email: &str) -> UserAccount {
        UserAccount {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            firstname: "Ann".to_string(),
            lastname: "Lee".to_string(),
            role: Role::User,
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    fn session(user_id: Uuid, token: &str) -> SessionRecord {
        let now = Utc::now();
        SessionRecord {
            id: Uuid::new_v4(),
            user_id,
            token: token.to_string(),
            expires_at: now + Duration::hours(24),
            created_at: now,
        }
    }

    fn reset(user_id: Uuid, token: &str, expires_at: DateTime<Utc>) -> PasswordResetToken {
        PasswordResetToken {
            id: Uuid::new_v4(),
            user_id,
            token: token.to_string(),
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let store = InMemoryStore::new();
        store.create_user(account("a@x.com")).await.expect("first");
        let err = store
            .create_user(account("A@X.COM"))
            .await
            .err()
            .expect("duplicate");
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list_users().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn lookup_by_email_ignores_case() {
        let store = InMemoryStore::new();
        let created = store.create_user(account("a@x.com")).await.expect("user");
        let found = store
            .user_by_email("A@x.Com")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn revoke_session_is_idempotent() {
        let store = InMemoryStore::new();
        let user = store.create_user(account("a@x.com")).await.expect("user");
        store
            .record_session(session(user.id, "tok-1"))
            .await
            .expect("record");
        assert_eq!(store.revoke_session("tok-1").await.expect("revoke"), 1);
        assert_eq!(store.revoke_session("tok-1").await.expect("again"), 0);
        assert_eq!(store.revoke_session("absent").await.expect("absent"), 0);
    }

    #[tokio::test]
    async fn revoke_user_sessions_removes_only_that_user() {
        let store = InMemoryStore::new();
        let one = store.create_user(account("a@x.com")).await.expect("one");
        let two = store.create_user(account("b@x.com")).await.expect("two");
        store
            .record_session(session(one.id, "tok-1"))
            .await
            .expect("s1");
        store
            .record_session(session(one.id, "tok-2"))
            .await
            .expect("s2");
        store
            .record_session(session(two.id, "tok-3"))
            .await
            .expect("s3");
        assert_eq!(store.revoke_user_sessions(one.id).await.expect("bulk"), 2);
        assert!(store.session_exists("tok-3").await.expect("other intact"));
    }

    #[tokio::test]
    async fn reset_token_consumes_exactly_once() {
        let store = InMemoryStore::new();
        let user = store.create_user(account("a@x.com")).await.expect("user");
        let now = Utc::now();
        store
            .create_reset_token(reset(user.id, "r-1", now + Duration::hours(1)))
            .await
            .expect("create");
        let first = store
            .consume_reset_token("r-1", now)
            .await
            .expect("consume");
        assert!(first.is_some());
        let second = store.consume_reset_token("r-1", now).await.expect("again");
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected_and_left_in_place() {
        let store = InMemoryStore::new();
        let user = store.create_user(account("a@x.com")).await.expect("user");
        let now = Utc::now();
        store
            .create_reset_token(reset(user.id, "r-old", now - Duration::minutes(1)))
            .await
            .expect("create");
        let consumed = store
            .consume_reset_token("r-old", now)
            .await
            .expect("consume");
        assert!(consumed.is_none());
        // The inert row remains; no sweeper removes it.
        assert!(store.reset_tokens.read().await.contains_key("r-old"));
    }
}
