//! Message repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use cipherchat_core::error::{AppError, ErrorKind};
use cipherchat_core::result::AppResult;
use cipherchat_core::traits::message_store::MessageStore;
use cipherchat_entity::message::{Message, MessageStatus};

/// Repository for the append-only message log.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn insert(&self, message: &Message) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO messages (id, from_user, to_user, ciphertext, nonce, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(message.id)
        .bind(message.from_user)
        .bind(message.to_user)
        .bind(&message.ciphertext)
        .bind(&message.nonce)
        .bind(message.status)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::StoreUnavailable, "Failed to insert message", e)
        })?;
        Ok(())
    }

    async fn update_status_if_higher(&self, id: Uuid, status: MessageStatus) -> AppResult<bool> {
        // Atomic set-if-higher: concurrent delivered/read acks arriving
        // out of order can never regress the status.
        let result = sqlx::query(
            "UPDATE messages SET status = $2 \
             WHERE id = $1 \
               AND CASE status \
                     WHEN 'sent' THEN 1 WHEN 'delivered' THEN 2 ELSE 3 END \
                 < CASE $2::message_status \
                     WHEN 'sent' THEN 1 WHEN 'delivered' THEN 2 ELSE 3 END",
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::StoreUnavailable,
                "Failed to update message status",
                e,
            )
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_pending(&self, user_id: Uuid, limit: u32) -> AppResult<Vec<Message>> {
        sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE to_user = $1 AND status = 'sent' \
             ORDER BY created_at ASC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::StoreUnavailable,
                "Failed to load pending messages",
                e,
            )
        })
    }

    async fn find_sender_of(&self, id: Uuid) -> AppResult<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>("SELECT from_user FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    "Failed to find message sender",
                    e,
                )
            })
    }
}
