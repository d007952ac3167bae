//! Ciphertext message envelope and delivery status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Delivery status of a message.
///
/// Status is monotonically non-decreasing per message: `Sent < Delivered <
/// Read`. A message may jump straight from `Sent` to `Read` when a client
/// marks read before its own delivered acknowledgement lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Persisted, not yet acknowledged by the recipient.
    Sent,
    /// Acknowledged as received by the recipient's device.
    Delivered,
    /// Acknowledged as read; implies delivered.
    Read,
}

impl MessageStatus {
    /// Total rank order used for set-if-higher transitions.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Sent => 1,
            Self::Delivered => 2,
            Self::Read => 3,
        }
    }

    /// Whether transitioning to `next` would advance the status.
    pub fn advances_to(&self, next: MessageStatus) -> bool {
        next.rank() > self.rank()
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted ciphertext envelope.
///
/// The ciphertext and nonce are opaque bytes produced and consumed
/// entirely by clients; the server never inspects them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Unique message identifier.
    pub id: Uuid,
    /// Sending user.
    pub from_user: Uuid,
    /// Receiving user.
    pub to_user: Uuid,
    /// Opaque ciphertext payload.
    pub ciphertext: String,
    /// Optional encryption nonce supplied by the sender.
    pub nonce: Option<String>,
    /// Current delivery status.
    pub status: MessageStatus,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

/// Data required to persist a new message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    /// Sending user.
    pub from_user: Uuid,
    /// Receiving user.
    pub to_user: Uuid,
    /// Opaque ciphertext payload.
    pub ciphertext: String,
    /// Optional encryption nonce.
    pub nonce: Option<String>,
}

impl NewMessage {
    /// Materializes a `Message` with a fresh id, `Sent` status, and the
    /// current timestamp.
    pub fn into_message(self) -> Message {
        Message {
            id: Uuid::new_v4(),
            from_user: self.from_user,
            to_user: self.to_user,
            ciphertext: self.ciphertext,
            nonce: self.nonce,
            status: MessageStatus::Sent,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_is_total_and_monotonic() {
        assert!(MessageStatus::Sent.advances_to(MessageStatus::Delivered));
        assert!(MessageStatus::Sent.advances_to(MessageStatus::Read));
        assert!(MessageStatus::Delivered.advances_to(MessageStatus::Read));
        assert!(!MessageStatus::Read.advances_to(MessageStatus::Delivered));
        assert!(!MessageStatus::Delivered.advances_to(MessageStatus::Delivered));
    }
}
