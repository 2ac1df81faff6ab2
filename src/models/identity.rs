//! Identity records: users plus the session-management leaves that reference
//! them (OAuth accounts, sessions, verification tokens).

use crate::api::{AccountId, SessionId, UserId};
use crate::models::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user. Almost every other entity references one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Database ID
    pub id: UserId,
    pub name: Option<String>,
    /// Unique when present
    pub email: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub role: Role,
}

impl NewUser {
    pub fn new(name: Option<String>, email: Option<String>, role: Role) -> Self {
        Self {
            name,
            email,
            image: None,
            role,
        }
    }
}

/// A linked OAuth provider account.
///
/// The `(provider, provider_account_id)` pair is unique; repeated sign-ins
/// through the same provider upsert the token columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Database ID
    pub id: AccountId,
    pub user_id: UserId,
    /// Provider account category, e.g. "oauth"
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    /// Access token expiry as a unix timestamp
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
    pub session_state: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for linking (or refreshing) a provider account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub user_id: UserId,
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub session_state: Option<String>,
}

impl NewAccount {
    pub fn new(
        user_id: UserId,
        account_type: String,
        provider: String,
        provider_account_id: String,
    ) -> Self {
        Self {
            user_id,
            account_type,
            provider,
            provider_account_id,
            refresh_token: None,
            access_token: None,
            expires_at: None,
            token_type: None,
            scope: None,
            id_token: None,
            session_state: None,
        }
    }
}

/// An active login session, looked up by its opaque token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Database ID
    pub id: SessionId,
    /// Unique opaque token held by the client
    pub session_token: String,
    pub user_id: UserId,
    pub expires: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub session_token: String,
    pub user_id: UserId,
    pub expires: DateTime<Utc>,
}

impl NewSession {
    pub fn new(session_token: String, user_id: UserId, expires: DateTime<Utc>) -> Self {
        Self {
            session_token,
            user_id,
            expires,
        }
    }
}

/// A single-use email verification token, keyed by `(identifier, token)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationToken {
    /// Email address or similar identifier being verified
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl VerificationToken {
    /// Whether the token is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}
