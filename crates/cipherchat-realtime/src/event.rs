//! Wire event types.
//!
//! Both directions are internally tagged JSON. The inbound enum doubles
//! as the event table: an event the engine handles is a variant here,
//! and nothing else is dispatched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cipherchat_core::result::AppResult;
use cipherchat_core::traits::GroupEvent;
use cipherchat_entity::message::{Message, MessageStatus};

/// Client-to-server events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Send an encrypted message to another user.
    SendMessage {
        /// Recipient user ID.
        to_user_id: Uuid,
        /// Opaque encrypted payload.
        ciphertext: String,
        /// Encryption nonce, if the client's scheme uses one.
        #[serde(default)]
        nonce: Option<String>,
    },
    /// The recipient's device has stored the message.
    MessageDelivered {
        /// Acknowledged message ID.
        message_id: Uuid,
    },
    /// The recipient has read the message.
    MessageRead {
        /// Acknowledged message ID.
        message_id: Uuid,
    },
    /// The sender started typing.
    Typing {
        /// User being typed at.
        to_user_id: Uuid,
    },
    /// The sender stopped typing.
    StopTyping {
        /// User being typed at.
        to_user_id: Uuid,
    },
}

/// Server-to-client events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Emitted once on successful admission.
    Connected {
        /// Authenticated user ID.
        user_id: Uuid,
        /// Authenticated phone number.
        phone: String,
    },
    /// Renewed credentials minted during the handshake.
    Tokens {
        /// Fresh access credential.
        access_token: String,
        /// Access credential expiry.
        access_expires_at: DateTime<Utc>,
        /// Rotated refresh credential, when rotation fired.
        #[serde(skip_serializing_if = "Option::is_none")]
        refresh_token: Option<String>,
        /// Rotated refresh credential expiry.
        #[serde(skip_serializing_if = "Option::is_none")]
        refresh_expires_at: Option<DateTime<Utc>>,
    },
    /// A new or replayed encrypted message.
    ChatMessage {
        /// The full message record.
        message: Message,
    },
    /// Acknowledgement to the sender that their message was persisted.
    MessageSent {
        /// Generated message ID.
        message_id: Uuid,
    },
    /// A message's status advanced.
    MessageStatusUpdate {
        /// Affected message.
        message_id: Uuid,
        /// New status.
        status: MessageStatus,
    },
    /// A peer started typing.
    Typing {
        /// Typing user.
        from_user_id: Uuid,
    },
    /// A peer stopped typing.
    StopTyping {
        /// Typing user.
        from_user_id: Uuid,
    },
    /// A client-visible failure on this connection.
    Error {
        /// Machine-readable code.
        code: String,
        /// Human-readable description.
        message: String,
    },
}

impl OutboundEvent {
    /// Event name as published on the backplane.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Tokens { .. } => "tokens",
            Self::ChatMessage { .. } => "chat_message",
            Self::MessageSent { .. } => "message_sent",
            Self::MessageStatusUpdate { .. } => "message_status_update",
            Self::Typing { .. } => "typing",
            Self::StopTyping { .. } => "stop_typing",
            Self::Error { .. } => "error",
        }
    }

    /// Wraps this event for backplane publication. The payload is the
    /// full tagged event, so subscribers relay it to the wire verbatim.
    pub fn into_group_event(self) -> AppResult<GroupEvent> {
        GroupEvent::new(self.name(), &self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_events_parse_from_tagged_json() {
        let raw = r#"{"type":"send_message","to_user_id":"7f8de0e6-55b4-4bfa-9c17-1e8f0a1e2b3c","ciphertext":"abc"}"#;
        let event: InboundEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            event,
            InboundEvent::SendMessage { nonce: None, .. }
        ));

        let raw = r#"{"type":"message_read","message_id":"7f8de0e6-55b4-4bfa-9c17-1e8f0a1e2b3c"}"#;
        assert!(matches!(
            serde_json::from_str::<InboundEvent>(raw).unwrap(),
            InboundEvent::MessageRead { .. }
        ));
    }

    #[test]
    fn unknown_inbound_event_is_rejected() {
        let raw = r#"{"type":"shutdown_server"}"#;
        assert!(serde_json::from_str::<InboundEvent>(raw).is_err());
    }

    #[test]
    fn outbound_group_event_keeps_the_tag() {
        let event = OutboundEvent::MessageSent {
            message_id: Uuid::new_v4(),
        };
        let group = event.into_group_event().unwrap();
        assert_eq!(group.event, "message_sent");
        assert_eq!(group.payload["type"], "message_sent");
    }
}
