//! Domain types for accounts, sessions, and password reset tokens.
//!
//! # Purpose
//! Defines the shapes persisted by the store backends and the outward-facing
//! account shape returned by the API.
//!
//! # Notes
//! `UserAccount` carries the password hash and does not implement
//! `Serialize`; handlers convert to [`UserProfile`] before anything crosses
//! the HTTP boundary.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Account role, ordered from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Lawyer,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Lawyer => "lawyer",
            Role::User => "user",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Role::Admin),
            "lawyer" => Ok(Role::Lawyer),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored credential row.
///
/// Accounts are never hard-deleted; `is_active = false` is the
/// deletion-equivalent. Email is unique case-insensitively across all rows
/// regardless of active status.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub firstname: String,
    pub lastname: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// The outward-facing account shape. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<UserAccount> for UserProfile {
    fn from(account: UserAccount) -> Self {
        UserProfile {
            id: account.id,
            email: account.email,
            firstname: account.firstname,
            lastname: account.lastname,
            role: account.role,
            is_active: account.is_active,
            created_at: account.created_at,
            last_login: account.last_login,
        }
    }
}

/// A registry row recording an issued session credential.
///
/// The row is evidence of intent to allow a session, not authoritative by
/// itself: the credential's embedded expiry is always checked independently.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A single-use recovery credential. Usable at most once; consumption deletes
/// the row atomically.
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
