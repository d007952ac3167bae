//! Refresh session entity and device binding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The device a refresh session is bound to.
///
/// A session only renews when the presenting device id and name match
/// this record; the IP check is a deployment-configurable policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceBinding {
    /// Stable client-generated device identifier.
    pub device_id: String,
    /// Human-readable device name.
    pub device_name: String,
    /// Last IP the session was used from.
    pub last_ip: Option<String>,
}

/// A persisted refresh session.
///
/// At most one refresh session exists per user (single active device
/// policy); creating a new one supersedes all prior sessions for that
/// user. The `token` value is globally unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshSession {
    /// Unique session identifier.
    pub id: Uuid,
    /// The user this session belongs to.
    pub user_id: Uuid,
    /// The refresh credential bound to this session.
    pub token: String,
    /// Device the session was created on.
    #[sqlx(flatten)]
    pub device: DeviceBinding,
    /// When the session was created (login time).
    pub created_at: DateTime<Utc>,
    /// Last time the session renewed an access credential.
    pub last_used_at: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}

impl RefreshSession {
    /// Check whether the session has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Remaining lifetime; zero when already expired.
    pub fn remaining(&self) -> chrono::Duration {
        (self.expires_at - Utc::now()).max(chrono::Duration::zero())
    }
}

impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for DeviceBinding {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            device_id: row.try_get("device_id")?,
            device_name: row.try_get("device_name")?,
            last_ip: row.try_get("last_ip")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_and_remaining() {
        let session = RefreshSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: "tok".into(),
            device: DeviceBinding {
                device_id: "dev-1".into(),
                device_name: "Pixel 8".into(),
                last_ip: None,
            },
            created_at: Utc::now(),
            last_used_at: Utc::now(),
            expires_at: Utc::now() - chrono::Duration::minutes(1),
        };
        assert!(session.is_expired());
        assert_eq!(session.remaining(), chrono::Duration::zero());
    }
}
