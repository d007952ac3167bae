//! Connection registration with a per-user cap.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use cipherchat_core::error::AppError;
use cipherchat_core::result::AppResult;

use super::handle::{ConnectionHandle, ConnectionId};
use super::pool::ConnectionPool;

/// Registers and unregisters connections against the pool.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Shared connection pool.
    pool: Arc<ConnectionPool>,
    /// Maximum simultaneous connections per user.
    max_connections_per_user: usize,
}

impl ConnectionManager {
    /// Creates a manager over the given pool.
    pub fn new(pool: Arc<ConnectionPool>, max_connections_per_user: usize) -> Self {
        Self {
            pool,
            max_connections_per_user,
        }
    }

    /// The pool this manager registers into.
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Registers a connection, enforcing the per-user cap.
    pub fn register(&self, handle: Arc<ConnectionHandle>) -> AppResult<()> {
        let existing = self.pool.user_connections(&handle.user_id);
        if existing.len() >= self.max_connections_per_user {
            return Err(AppError::conflict(format!(
                "Connection limit of {} reached",
                self.max_connections_per_user
            )));
        }

        info!(
            connection_id = %handle.id,
            user_id = %handle.user_id,
            device_id = %handle.device_id,
            "Connection registered"
        );
        self.pool.add(handle);
        Ok(())
    }

    /// Unregisters a connection and marks it dead.
    pub fn unregister(&self, connection_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let handle = self.pool.remove(connection_id)?;
        handle.mark_dead();
        info!(
            connection_id = %connection_id,
            user_id = %handle.user_id,
            "Connection unregistered"
        );
        Some(handle)
    }

    /// Whether a user has at least one live local connection.
    pub fn is_online(&self, user_id: &Uuid) -> bool {
        !self.pool.user_connections(user_id).is_empty()
    }
}
