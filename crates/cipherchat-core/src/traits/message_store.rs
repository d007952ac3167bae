//! Message store contract.

use async_trait::async_trait;
use uuid::Uuid;

use cipherchat_entity::message::{Message, MessageStatus};

use crate::result::AppResult;

/// Durable log of ciphertext envelopes with a delivery status field.
///
/// Creation is append-only; the status transition is a single atomic
/// conditional update ("set if higher rank") so that concurrent
/// delivered/read acknowledgements arriving out of order can never
/// regress a message's status. Messages are never deleted by the core.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Appends a new message.
    async fn insert(&self, message: &Message) -> AppResult<()>;

    /// Advances the message status if `status` ranks higher than the
    /// current value. Returns `true` when the row was updated, `false`
    /// when the transition was a no-op (already at or past `status`).
    async fn update_status_if_higher(&self, id: Uuid, status: MessageStatus) -> AppResult<bool>;

    /// Returns undelivered (`sent`) messages for a user, ordered by
    /// creation time ascending, capped at `limit`.
    async fn find_pending(&self, user_id: Uuid, limit: u32) -> AppResult<Vec<Message>>;

    /// Returns the sender of a message, if the message exists.
    async fn find_sender_of(&self, id: Uuid) -> AppResult<Option<Uuid>>;
}
