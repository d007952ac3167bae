//! Request bodies.

use serde::{Deserialize, Serialize};

use cipherchat_core::error::AppError;
use cipherchat_core::result::AppResult;

/// POST /api/auth/login body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Phone number the account is registered under.
    pub phone: String,
    /// Stable client-generated device identifier.
    pub device_id: String,
    /// Human-readable device name.
    pub device_name: String,
    /// IP the client reports for itself; the server falls back to the
    /// transport address when absent.
    #[serde(default)]
    pub last_ip: Option<String>,
    /// Client-published public key.
    pub public_key: String,
    /// Push notification token.
    pub push_token: String,
}

impl LoginRequest {
    /// Rejects bodies with empty required fields.
    pub fn validate(&self) -> AppResult<()> {
        if self.phone.trim().is_empty() {
            return Err(AppError::validation("Phone is required"));
        }
        if self.device_id.trim().is_empty() || self.device_name.trim().is_empty() {
            return Err(AppError::validation("Device id and device name are required"));
        }
        if self.public_key.trim().is_empty() {
            return Err(AppError::validation("Public key is required"));
        }
        Ok(())
    }
}
