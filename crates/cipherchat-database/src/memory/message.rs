//! In-memory message store using a Tokio mutex.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use cipherchat_core::result::AppResult;
use cipherchat_core::traits::message_store::MessageStore;
use cipherchat_entity::message::{Message, MessageStatus};

/// In-memory message log keyed by message id.
#[derive(Debug, Clone, Default)]
pub struct MemoryMessageStore {
    /// Protected message map.
    messages: Arc<Mutex<HashMap<Uuid, Message>>>,
}

impl MemoryMessageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a message by id (test helper).
    pub async fn get(&self, id: Uuid) -> Option<Message> {
        self.messages.lock().await.get(&id).cloned()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn insert(&self, message: &Message) -> AppResult<()> {
        let mut messages = self.messages.lock().await;
        messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn update_status_if_higher(&self, id: Uuid, status: MessageStatus) -> AppResult<bool> {
        let mut messages = self.messages.lock().await;
        match messages.get_mut(&id) {
            Some(message) if message.status.advances_to(status) => {
                message.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_pending(&self, user_id: Uuid, limit: u32) -> AppResult<Vec<Message>> {
        let messages = self.messages.lock().await;
        let mut pending: Vec<Message> = messages
            .values()
            .filter(|m| m.to_user == user_id && m.status == MessageStatus::Sent)
            .cloned()
            .collect();
        pending.sort_by_key(|m| m.created_at);
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn find_sender_of(&self, id: Uuid) -> AppResult<Option<Uuid>> {
        let messages = self.messages.lock().await;
        Ok(messages.get(&id).map(|m| m.from_user))
    }
}
