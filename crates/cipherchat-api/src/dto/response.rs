//! Response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cipherchat_entity::user::User;

/// POST /api/auth/login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Short-lived access credential.
    pub access_token: String,
    /// Access credential expiry.
    pub access_expires_at: DateTime<Utc>,
    /// Long-lived refresh credential.
    pub refresh_token: String,
    /// Refresh credential expiry.
    pub refresh_expires_at: DateTime<Utc>,
    /// The logged-in account.
    pub user: ProfileResponse,
}

/// Public view of a user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    /// User ID.
    pub id: Uuid,
    /// Phone number.
    pub phone: String,
    /// Role name.
    pub role: String,
    /// Published public key.
    pub public_key: String,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            phone: user.phone.clone(),
            role: user.role.to_string(),
            public_key: user.public_key.clone(),
            created_at: user.created_at,
        }
    }
}

/// Simple acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Outcome description.
    pub message: String,
}

impl MessageResponse {
    /// Builds an acknowledgement.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
