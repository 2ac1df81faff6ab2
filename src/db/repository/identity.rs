//! Identity repository trait: users and the session-management leaves.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::UserId;
use crate::models::{
    Account, NewAccount, NewSession, NewUser, Role, Session, User, VerificationToken,
};
use chrono::{DateTime, Utc};

/// Repository trait for identity records.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    // ==================== User Operations ====================

    /// Create a user. Fails with `ConflictError` when the email is already
    /// registered.
    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User>;

    /// Retrieve a user by ID.
    async fn get_user(&self, user_id: UserId) -> RepositoryResult<User>;

    /// Look up a user by email. `Ok(None)` when no user has that email.
    async fn get_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    /// Change a user's role.
    async fn set_user_role(&self, user_id: UserId, role: Role) -> RepositoryResult<User>;

    // ==================== Provider Accounts ====================

    /// Link a provider account, or refresh its token columns if the
    /// `(provider, provider_account_id)` pair is already linked.
    async fn upsert_account(&self, account: &NewAccount) -> RepositoryResult<Account>;

    /// All provider accounts linked to a user.
    async fn accounts_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<Account>>;

    // ==================== Sessions ====================

    /// Create a session. The token must be unique.
    async fn create_session(&self, session: &NewSession) -> RepositoryResult<Session>;

    /// Look up a session by its opaque token. `Ok(None)` when absent.
    async fn get_session_by_token(&self, token: &str) -> RepositoryResult<Option<Session>>;

    /// Delete a session by token.
    ///
    /// # Returns
    /// * `Ok(true)` - A session was removed
    /// * `Ok(false)` - No such session; not an error
    async fn delete_session(&self, token: &str) -> RepositoryResult<bool>;

    /// Remove every session whose expiry is at or before `now`.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of sessions removed
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> RepositoryResult<usize>;

    // ==================== Verification Tokens ====================

    /// Store a verification token for `(identifier, token)`.
    async fn create_verification_token(
        &self,
        identifier: &str,
        token: &str,
        expires: DateTime<Utc>,
    ) -> RepositoryResult<VerificationToken>;

    /// Atomically fetch and delete the token for `(identifier, token)`.
    ///
    /// Returns the stored record even when already expired; expiry handling
    /// belongs to the caller. `Ok(None)` when no such token exists.
    async fn consume_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> RepositoryResult<Option<VerificationToken>>;
}
