//! In-memory refresh session store using a Tokio mutex.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use cipherchat_core::result::AppResult;
use cipherchat_core::traits::session_store::{SessionStore, SessionUpsert};
use cipherchat_entity::session::{DeviceBinding, RefreshSession};

/// In-memory session store keyed by session id.
///
/// Suitable for single-node deployments and tests only.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    /// Protected session map.
    sessions: Arc<Mutex<HashMap<Uuid, RefreshSession>>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions (test helper).
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether the store is empty (test helper).
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Returns the session for a user, if any (test helper).
    pub async fn find_by_user(&self, user_id: Uuid) -> Option<RefreshSession> {
        self.sessions
            .lock()
            .await
            .values()
            .find(|s| s.user_id == user_id)
            .cloned()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn find_by_token(&self, token: &str) -> AppResult<Option<RefreshSession>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.values().find(|s| s.token == token).cloned())
    }

    async fn upsert(&self, upsert: SessionUpsert) -> AppResult<RefreshSession> {
        let mut sessions = self.sessions.lock().await;

        // Single-session-per-user: drop whatever the user held before.
        sessions.retain(|_, s| s.user_id != upsert.user_id);

        let now = Utc::now();
        let session = RefreshSession {
            id: Uuid::new_v4(),
            user_id: upsert.user_id,
            token: upsert.token,
            device: DeviceBinding {
                device_id: upsert.device_id,
                device_name: upsert.device_name,
                last_ip: upsert.last_ip,
            },
            created_at: now,
            last_used_at: now,
            expires_at: upsert.expires_at,
        };
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn touch(&self, session_id: Uuid, last_ip: Option<&str>) -> AppResult<()> {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(&session_id) {
            session.last_used_at = Utc::now();
            if let Some(ip) = last_ip {
                session.device.last_ip = Some(ip.to_string());
            }
        }
        Ok(())
    }

    async fn rotate_token(
        &self,
        session_id: Uuid,
        old_token: &str,
        new_token: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(&session_id) {
            Some(session) if session.token == old_token => {
                session.token = new_token.to_string();
                session.expires_at = expires_at;
                session.last_used_at = Utc::now();
                Ok(true)
            }
            _ => {
                debug!(session_id = %session_id, "Rotation lost race with supersede");
                Ok(false)
            }
        }
    }

    async fn delete_by_token(&self, token: &str) -> AppResult<()> {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, s| s.token != token);
        Ok(())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> AppResult<()> {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, s| s.user_id != user_id);
        Ok(())
    }

    async fn delete_by_device(&self, device_id: &str) -> AppResult<()> {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, s| s.device.device_id != device_id);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at >= now);
        Ok((before - sessions.len()) as u64)
    }
}
