//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use cipherchat_auth::gate::SessionGate;
use cipherchat_auth::jwt::CredentialEncoder;
use cipherchat_core::config::AppConfig;
use cipherchat_core::traits::{SessionStore, UserDirectory};
use cipherchat_realtime::DeliveryEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Session authentication gate.
    pub gate: Arc<SessionGate>,
    /// Real-time delivery engine.
    pub engine: Arc<DeliveryEngine>,
    /// Credential encoder for the login flow.
    pub encoder: Arc<CredentialEncoder>,
    /// User lookup and registration.
    pub users: Arc<dyn UserDirectory>,
    /// Refresh session store.
    pub sessions: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish()
    }
}
