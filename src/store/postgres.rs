//! Postgres-backed implementation of the auth store.
//!
//! # Purpose
//! Implements [`AuthStore`] using Postgres via `sqlx` as the durable backend
//! for the three auth tables: `users`, `user_sessions`, and
//! `password_reset_tokens`.
//!
//! # Key invariants
//! - Email uniqueness is enforced by a unique index on `lower(email)`; the
//!   resulting unique violation maps to [`StoreError::Conflict`].
//! - Reset-token consumption is a single conditional `DELETE … RETURNING`
//!   guarded by the expiry, so at most one concurrent caller succeeds.
//! - Migrations run at startup; handlers can assume the schema exists.
//!
//! # Concurrency model
//! The store is shared across async handlers; `sqlx::PgPool` manages
//! connection concurrency. Pool sizing and acquire timeouts are explicit
//! because hanging forever on a degraded database is unacceptable for the
//! service every other router depends on.
//!
//! # Security notes
//! - Database URLs may contain credentials; they are never logged.
//! - All statements bind parameters; there is no dynamic SQL.
use super::{AuthStore, StoreError, StoreResult};
use crate::config::PostgresConfig;
use crate::model::{PasswordResetToken, Role, SessionRecord, UserAccount};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Durable auth store backed by Postgres.
pub struct PostgresStore {
    pool: PgPool,
}

/// Row shape for the `users` authoritative table.
///
/// DB-facing structs stay separate from domain types so schema details and
/// string-to-enum parsing remain localized here.
#[derive(Debug, Clone, FromRow)]
struct DbUser {
    id: Uuid,
    email: String,
    password_hash: String,
    firstname: String,
    lastname: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

/// Row shape for the `password_reset_tokens` table.
#[derive(Debug, Clone, FromRow)]
struct DbResetToken {
    id: Uuid,
    user_id: Uuid,
    token: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

const USER_COLUMNS: &str =
    "id, email, password_hash, firstname, lastname, role, is_active, created_at, last_login";

fn map_user(row: DbUser) -> StoreResult<UserAccount> {
    let role = Role::from_str(&row.role)
        .map_err(|err| StoreError::Unexpected(anyhow!("users row {}: {err}", row.id)))?;
    Ok(UserAccount {
        id: row.id,
        email: row.email,
        password_hash: row.password_hash,
        firstname: row.firstname,
        lastname: row.lastname,
        role,
        is_active: row.is_active,
        created_at: row.created_at,
        last_login: row.last_login,
    })
}

fn map_reset(row: DbResetToken) -> PasswordResetToken {
    PasswordResetToken {
        id: row.id,
        user_id: row.user_id,
        token: row.token,
        expires_at: row.expires_at,
        created_at: row.created_at,
    }
}

impl PostgresStore {
    /// Connect to Postgres and run the embedded migrations.
    ///
    /// Migrations run before the store is handed out so handlers never see a
    /// partial schema. A migration failure fails startup.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, true).await
    }

    /// Connect without running migrations. For tests that manage the schema
    /// externally.
    #[cfg(any(test, feature = "pg-tests"))]
    pub async fn connect_without_migrations(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, false).await
    }

    async fn connect_internal(pg: &PostgresConfig, run_migrations: bool) -> StoreResult<Self> {
        // `max_connections` caps concurrent DB work; `acquire_timeout` bounds
        // how long a request waits for a pooled connection before failing
        // fast. The URL is not logged because it may contain credentials.
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options)
            .await?;

        if run_migrations {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|err| StoreError::Unexpected(err.into()))?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl AuthStore for PostgresStore {
    async fn create_user(&self, user: UserAccount) -> StoreResult<UserAccount> {
        let insert = sqlx::query(
            r#"INSERT INTO users (id, email, password_hash, firstname, lastname, role, is_active, created_at, last_login)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.last_login)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("email already registered".into()));
            }
            return Err(StoreError::Unexpected(err.into()));
        }
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<UserAccount>> {
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(map_user).transpose()
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<UserAccount>> {
        let row =
            sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(map_user).transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<UserAccount>> {
        let rows = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(map_user).collect()
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user".into()));
        }
        Ok(())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user".into()));
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        firstname: &str,
        lastname: &str,
    ) -> StoreResult<UserAccount> {
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "UPDATE users SET firstname = $2, lastname = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(firstname)
        .bind(lastname)
        .fetch_optional(&self.pool)
        .await?;
        let row = row.ok_or_else(|| StoreError::NotFound("user".into()))?;
        map_user(row)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> StoreResult<UserAccount> {
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        let row = row.ok_or_else(|| StoreError::NotFound("user".into()))?;
        map_user(row)
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> StoreResult<UserAccount> {
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "UPDATE users SET is_active = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;
        let row = row.ok_or_else(|| StoreError::NotFound("user".into()))?;
        map_user(row)
    }

    async fn record_session(&self, session: SessionRecord) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO user_sessions (id, user_id, token, expires_at, created_at)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.token)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn session_exists(&self, token: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM user_sessions WHERE token = $1)",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn revoke_session(&self, token: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn revoke_user_sessions(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn create_reset_token(&self, token: PasswordResetToken) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO password_reset_tokens (id, user_id, token, expires_at, created_at)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<PasswordResetToken>> {
        // One conditional delete: the row comes back only if it matched and
        // had not expired, so concurrent consumers cannot both succeed.
        // Expired rows are left untouched.
        let row = sqlx::query_as::<_, DbResetToken>(
            r#"DELETE FROM password_reset_tokens
               WHERE token = $1 AND expires_at > $2
               RETURNING id, user_id, token, expires_at, created_at"#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(map_reset))
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505");
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn unknown_role_in_row_is_surfaced() {
        let row = DbUser {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            firstname: "Ann".to_string(),
            lastname: "Lee".to_string(),
            role: "superuser".to_string(),
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
        };
        let err = map_user(row).err().expect("bad role");
        assert!(matches!(err, StoreError::Unexpected(_)));
    }
}
