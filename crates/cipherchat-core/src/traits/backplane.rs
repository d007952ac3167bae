//! Delivery backplane contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::AppResult;

/// A named event published to a broadcast group.
///
/// The payload is an opaque JSON document; the backplane never inspects
/// it beyond relaying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEvent {
    /// Event name as emitted to clients (e.g. `chat_message`).
    pub event: String,
    /// Event payload.
    pub payload: serde_json::Value,
}

impl GroupEvent {
    /// Builds a group event from a serializable payload.
    pub fn new(event: impl Into<String>, payload: impl Serialize) -> AppResult<Self> {
        Ok(Self {
            event: event.into(),
            payload: serde_json::to_value(payload)?,
        })
    }
}

/// Process-spanning publish/subscribe fabric.
///
/// `publish` fans an event out to every process with a local member of
/// the group; membership is per-connection and dropped on disconnect.
/// No delivery ordering is guaranteed across distinct publishers.
#[async_trait]
pub trait Backplane: Send + Sync + 'static {
    /// Publishes an event to all members of a group, on any process.
    async fn publish(&self, group: &str, event: GroupEvent) -> AppResult<()>;

    /// Adds a local connection to a group.
    async fn subscribe(&self, connection_id: Uuid, group: &str) -> AppResult<()>;

    /// Removes a local connection from all of its groups.
    async fn unsubscribe_all(&self, connection_id: Uuid) -> AppResult<()>;
}

/// Conventional group name for a user's connections across all processes.
pub fn user_group(user_id: Uuid) -> String {
    format!("user:{user_id}")
}
