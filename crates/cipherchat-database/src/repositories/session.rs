//! Refresh session repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use cipherchat_core::error::{AppError, ErrorKind};
use cipherchat_core::result::AppResult;
use cipherchat_core::traits::session_store::{SessionStore, SessionUpsert};
use cipherchat_entity::session::RefreshSession;

/// Repository for refresh session records.
///
/// The `refresh_sessions` table carries unique indexes on `user_id` and
/// `token`, enforcing the single-session-per-user and token-uniqueness
/// invariants at the store.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn find_by_token(&self, token: &str) -> AppResult<Option<RefreshSession>> {
        sqlx::query_as::<_, RefreshSession>("SELECT * FROM refresh_sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    "Failed to find session by token",
                    e,
                )
            })
    }

    async fn upsert(&self, upsert: SessionUpsert) -> AppResult<RefreshSession> {
        // Single-device policy: the conflict target is user_id, so a login
        // from a new device supersedes whatever session the user held.
        sqlx::query_as::<_, RefreshSession>(
            "INSERT INTO refresh_sessions \
               (id, user_id, token, device_id, device_name, last_ip, created_at, last_used_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW(), $7) \
             ON CONFLICT (user_id) DO UPDATE SET \
               token = EXCLUDED.token, \
               device_id = EXCLUDED.device_id, \
               device_name = EXCLUDED.device_name, \
               last_ip = EXCLUDED.last_ip, \
               last_used_at = NOW(), \
               expires_at = EXCLUDED.expires_at \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(upsert.user_id)
        .bind(&upsert.token)
        .bind(&upsert.device_id)
        .bind(&upsert.device_name)
        .bind(&upsert.last_ip)
        .bind(upsert.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::StoreUnavailable, "Failed to upsert session", e)
        })
    }

    async fn touch(&self, session_id: Uuid, last_ip: Option<&str>) -> AppResult<()> {
        sqlx::query(
            "UPDATE refresh_sessions SET last_used_at = NOW(), last_ip = COALESCE($2, last_ip) \
             WHERE id = $1",
        )
        .bind(session_id)
        .bind(last_ip)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::StoreUnavailable, "Failed to touch session", e)
        })?;
        Ok(())
    }

    async fn rotate_token(
        &self,
        session_id: Uuid,
        old_token: &str,
        new_token: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        // Conditional on the old token: a rotation racing a login
        // supersede matches zero rows and reports the lost race.
        let result = sqlx::query(
            "UPDATE refresh_sessions SET token = $3, expires_at = $4, last_used_at = NOW() \
             WHERE id = $1 AND token = $2",
        )
        .bind(session_id)
        .bind(old_token)
        .bind(new_token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::StoreUnavailable, "Failed to rotate session", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_token(&self, token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM refresh_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    "Failed to delete session by token",
                    e,
                )
            })?;
        Ok(())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM refresh_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    "Failed to delete sessions by user",
                    e,
                )
            })?;
        Ok(())
    }

    async fn delete_by_device(&self, device_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM refresh_sessions WHERE device_id = $1")
            .bind(device_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    "Failed to delete sessions by device",
                    e,
                )
            })?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    "Failed to purge expired sessions",
                    e,
                )
            })?;
        Ok(result.rows_affected())
    }
}
