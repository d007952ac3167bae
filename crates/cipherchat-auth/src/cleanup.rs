//! Expired refresh session cleanup.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use cipherchat_core::result::AppResult;
use cipherchat_core::traits::SessionStore;

/// Periodically reaps refresh sessions past their expiry.
#[derive(Clone)]
pub struct SessionCleanup {
    /// Session store to reap.
    sessions: Arc<dyn SessionStore>,
    /// Interval between cleanup cycles.
    interval: Duration,
}

impl std::fmt::Debug for SessionCleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCleanup")
            .field("interval", &self.interval)
            .finish()
    }
}

impl SessionCleanup {
    /// Creates a cleanup handler running every `interval_minutes`.
    pub fn new(sessions: Arc<dyn SessionStore>, interval_minutes: u64) -> Self {
        Self {
            sessions,
            interval: Duration::from_secs(interval_minutes * 60),
        }
    }

    /// Runs one cleanup cycle. Returns the number of sessions removed.
    pub async fn run_cleanup(&self) -> AppResult<u64> {
        let removed = self.sessions.purge_expired(Utc::now()).await?;
        if removed > 0 {
            info!(count = removed, "Reaped expired refresh sessions");
        }
        Ok(removed)
    }

    /// Spawns the periodic cleanup loop.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick fires immediately; skip it so startup does
            // not race the pool coming up.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_cleanup().await {
                    error!(error = %e, "Session cleanup cycle failed");
                }
            }
        })
    }
}
