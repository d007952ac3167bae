//! User account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::identity::{Identity, UserRole};

/// A registered user account.
///
/// Owned by the user directory collaborator; the gate and delivery core
/// only ever read the identity projection of this record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Phone number the account was registered with (unique).
    pub phone: String,
    /// Role for authorization decisions.
    pub role: UserRole,
    /// Client-published public key for end-to-end encryption.
    pub public_key: String,
    /// Push notification token for the current device.
    pub push_token: Option<String>,
    /// Name of the device the account last logged in from.
    pub device_name: Option<String>,
    /// IP the account last logged in from.
    pub last_ip: Option<String>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Last time the device info was updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Projects this account into the identity embedded in credentials.
    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.phone.clone(), self.role)
    }
}
