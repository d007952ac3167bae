//! In-process group fan-out, optionally relayed across nodes.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use cipherchat_core::result::AppResult;
use cipherchat_core::traits::{Backplane, GroupEvent};

use crate::connection::{ConnectionId, ConnectionPool};

#[cfg(feature = "redis-pubsub")]
use super::redis_relay::RedisRelay;

/// Backplane that fans events out to local group members.
///
/// With the `redis-pubsub` feature and an attached relay, every publish
/// is also mirrored to Redis so that sibling processes can deliver to
/// their own local members of the same group.
pub struct LocalBackplane {
    /// Connections events are delivered to.
    pool: Arc<ConnectionPool>,
    /// Group name to member connection IDs.
    groups: DashMap<String, Vec<ConnectionId>>,
    /// Connection ID to the groups it joined.
    memberships: DashMap<ConnectionId, Vec<String>>,
    /// Cross-node relay, when configured.
    #[cfg(feature = "redis-pubsub")]
    relay: Option<Arc<RedisRelay>>,
}

impl std::fmt::Debug for LocalBackplane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackplane")
            .field("groups", &self.groups.len())
            .finish()
    }
}

impl LocalBackplane {
    /// Creates a single-node backplane over the given pool.
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self {
            pool,
            groups: DashMap::new(),
            memberships: DashMap::new(),
            #[cfg(feature = "redis-pubsub")]
            relay: None,
        }
    }

    /// Creates a backplane that mirrors publishes through Redis.
    #[cfg(feature = "redis-pubsub")]
    pub fn with_relay(pool: Arc<ConnectionPool>, relay: Arc<RedisRelay>) -> Self {
        Self {
            pool,
            groups: DashMap::new(),
            memberships: DashMap::new(),
            relay: Some(relay),
        }
    }

    /// Delivers an event to the local members of a group.
    ///
    /// Also the entry point for events arriving from the relay; remote
    /// publishes never re-enter `publish`, so nothing loops.
    pub fn deliver_local(&self, group: &str, event: &GroupEvent) {
        let Some(members) = self.groups.get(group) else {
            return;
        };
        for connection_id in members.iter() {
            if let Some(handle) = self.pool.get(connection_id) {
                handle.send(event.clone());
            }
        }
    }
}

#[async_trait]
impl Backplane for LocalBackplane {
    async fn publish(&self, group: &str, event: GroupEvent) -> AppResult<()> {
        self.deliver_local(group, &event);

        #[cfg(feature = "redis-pubsub")]
        if let Some(relay) = &self.relay {
            relay.publish(group, &event).await?;
        }

        Ok(())
    }

    async fn subscribe(&self, connection_id: ConnectionId, group: &str) -> AppResult<()> {
        let mut members = self.groups.entry(group.to_string()).or_default();
        if !members.contains(&connection_id) {
            members.push(connection_id);
        }
        drop(members);

        self.memberships
            .entry(connection_id)
            .or_default()
            .push(group.to_string());
        debug!(connection_id = %connection_id, group, "Joined group");
        Ok(())
    }

    async fn unsubscribe_all(&self, connection_id: ConnectionId) -> AppResult<()> {
        let Some((_, groups)) = self.memberships.remove(&connection_id) else {
            return Ok(());
        };
        for group in groups {
            if let Some(mut members) = self.groups.get_mut(&group) {
                members.retain(|id| *id != connection_id);
                if members.is_empty() {
                    drop(members);
                    self.groups.remove(&group);
                }
            }
        }
        debug!(connection_id = %connection_id, "Left all groups");
        Ok(())
    }
}
