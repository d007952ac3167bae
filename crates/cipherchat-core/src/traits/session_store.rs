//! Refresh session store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cipherchat_entity::session::RefreshSession;

use crate::result::AppResult;

/// Fields written when a login creates or supersedes a session.
#[derive(Debug, Clone)]
pub struct SessionUpsert {
    /// Owning user.
    pub user_id: Uuid,
    /// The refresh credential to persist.
    pub token: String,
    /// Device identifier the session is bound to.
    pub device_id: String,
    /// Device name the session is bound to.
    pub device_name: String,
    /// IP the login originated from.
    pub last_ip: Option<String>,
    /// Session expiry.
    pub expires_at: DateTime<Utc>,
}

/// Persistent record of one active refresh session per (user, device).
///
/// Implementations must guarantee token uniqueness and the
/// single-session-per-user invariant: an upsert for a user supersedes any
/// prior session that user held, regardless of device. All operations are
/// atomic single-record writes so that a gate rotation racing a login
/// supersede fails harmlessly rather than corrupting state.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Looks up a session by its refresh token value.
    async fn find_by_token(&self, token: &str) -> AppResult<Option<RefreshSession>>;

    /// Creates or supersedes the user's session.
    async fn upsert(&self, upsert: SessionUpsert) -> AppResult<RefreshSession>;

    /// Best-effort bookkeeping: bumps `last_used_at` and records the
    /// presented IP. Callers treat failure as non-fatal.
    async fn touch(&self, session_id: Uuid, last_ip: Option<&str>) -> AppResult<()>;

    /// Replaces the session's token and expiry in place (rotation).
    ///
    /// Conditional on the old token still being current; a lost race with
    /// a supersede leaves the store untouched.
    async fn rotate_token(
        &self,
        session_id: Uuid,
        old_token: &str,
        new_token: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Deletes the session holding the given token, if any.
    async fn delete_by_token(&self, token: &str) -> AppResult<()>;

    /// Deletes all sessions for a user.
    async fn delete_by_user(&self, user_id: Uuid) -> AppResult<()>;

    /// Deletes all sessions bound to a device.
    async fn delete_by_device(&self, device_id: &str) -> AppResult<()>;

    /// Reaps sessions past their expiry. Returns the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}
