//! The delivery engine.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use cipherchat_core::config::RealtimeConfig;
use cipherchat_core::error::AppError;
use cipherchat_core::result::AppResult;
use cipherchat_core::traits::{Backplane, GroupEvent, MessageStore, user_group};
use cipherchat_entity::identity::Identity;
use cipherchat_entity::message::{MessageStatus, NewMessage};

use crate::connection::{ConnectionHandle, ConnectionId, ConnectionManager};
use crate::event::{InboundEvent, OutboundEvent};

/// Binds authenticated connections to per-user groups and drives the
/// message status state machine.
///
/// Constructed once with handles to its collaborators and shared by
/// every connection task. Holds no authoritative message or session
/// state of its own.
pub struct DeliveryEngine {
    /// Durable message log.
    messages: Arc<dyn MessageStore>,
    /// Cross-process fan-out.
    backplane: Arc<dyn Backplane>,
    /// Local connection registry.
    manager: Arc<ConnectionManager>,
    /// Cap on messages replayed per admission.
    replay_limit: u32,
}

impl std::fmt::Debug for DeliveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryEngine")
            .field("replay_limit", &self.replay_limit)
            .finish()
    }
}

impl DeliveryEngine {
    /// Creates an engine over the given collaborators.
    pub fn new(
        messages: Arc<dyn MessageStore>,
        backplane: Arc<dyn Backplane>,
        manager: Arc<ConnectionManager>,
        config: &RealtimeConfig,
    ) -> Self {
        Self {
            messages,
            backplane,
            manager,
            replay_limit: config.replay_limit,
        }
    }

    /// The connection manager this engine registers through.
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Admits an authenticated connection.
    ///
    /// Registers it, joins the user's group, emits `connected`, then
    /// replays every pending message in creation order. Replay never
    /// mutates status, so repeating it across reconnects or multiple
    /// devices hands out the same set until the recipient acknowledges.
    pub async fn admit(
        &self,
        identity: &Identity,
        device_id: &str,
        sender: mpsc::Sender<GroupEvent>,
    ) -> AppResult<Arc<ConnectionHandle>> {
        let handle = Arc::new(ConnectionHandle::new(
            identity.user_id,
            device_id.to_string(),
            sender,
        ));
        self.manager.register(handle.clone())?;
        if let Err(e) = self
            .backplane
            .subscribe(handle.id, &user_group(identity.user_id))
            .await
        {
            // Release the cap slot; a half-admitted connection must not
            // linger in the pool.
            self.manager.unregister(&handle.id);
            return Err(e);
        }

        handle.send(
            OutboundEvent::Connected {
                user_id: identity.user_id,
                phone: identity.phone.clone(),
            }
            .into_group_event()?,
        );

        let pending = self
            .messages
            .find_pending(identity.user_id, self.replay_limit)
            .await?;
        if !pending.is_empty() {
            info!(
                user_id = %identity.user_id,
                count = pending.len(),
                "Replaying pending messages"
            );
        }
        for message in pending {
            handle.send(OutboundEvent::ChatMessage { message }.into_group_event()?);
        }

        Ok(handle)
    }

    /// Dispatches one inbound event.
    ///
    /// The match below is the complete event table; anything a client
    /// can trigger is a row here.
    pub async fn handle_event(
        &self,
        connection: &ConnectionHandle,
        event: InboundEvent,
    ) -> AppResult<()> {
        match event {
            InboundEvent::SendMessage {
                to_user_id,
                ciphertext,
                nonce,
            } => self.send(connection, to_user_id, ciphertext, nonce).await,
            InboundEvent::MessageDelivered { message_id } => {
                self.acknowledge(connection, message_id, MessageStatus::Delivered)
                    .await
            }
            InboundEvent::MessageRead { message_id } => {
                self.acknowledge(connection, message_id, MessageStatus::Read)
                    .await
            }
            InboundEvent::Typing { to_user_id } => {
                self.presence(connection, to_user_id, true).await
            }
            InboundEvent::StopTyping { to_user_id } => {
                self.presence(connection, to_user_id, false).await
            }
        }
    }

    /// Persists an encrypted message and publishes it to the recipient.
    ///
    /// Never blocks on recipient presence: an offline recipient picks
    /// the message up via replay.
    async fn send(
        &self,
        connection: &ConnectionHandle,
        to_user_id: Uuid,
        ciphertext: String,
        nonce: Option<String>,
    ) -> AppResult<()> {
        if to_user_id.is_nil() {
            return Err(AppError::invalid_envelope("Recipient is required"));
        }
        if ciphertext.is_empty() {
            return Err(AppError::invalid_envelope("Ciphertext is required"));
        }

        let message = NewMessage {
            from_user: connection.user_id,
            to_user: to_user_id,
            ciphertext,
            nonce,
        }
        .into_message();
        let message_id = message.id;

        self.messages.insert(&message).await?;
        self.backplane
            .publish(
                &user_group(to_user_id),
                OutboundEvent::ChatMessage { message }.into_group_event()?,
            )
            .await?;

        // Acknowledge to the sending connection only, with the id the
        // client needs to correlate future status updates.
        connection.send(OutboundEvent::MessageSent { message_id }.into_group_event()?);
        Ok(())
    }

    /// Applies a delivered/read acknowledgement.
    ///
    /// The store transition is set-if-higher, so out-of-order and
    /// duplicate acks are no-ops and status never regresses. Only a
    /// transition that actually advanced is announced to the sender.
    async fn acknowledge(
        &self,
        connection: &ConnectionHandle,
        message_id: Uuid,
        status: MessageStatus,
    ) -> AppResult<()> {
        let Some(sender_id) = self.messages.find_sender_of(message_id).await? else {
            debug!(message_id = %message_id, "Acknowledgement for unknown message");
            return Ok(());
        };

        let advanced = self
            .messages
            .update_status_if_higher(message_id, status)
            .await?;
        if !advanced {
            debug!(
                message_id = %message_id,
                status = %status,
                "Stale acknowledgement ignored"
            );
            return Ok(());
        }

        debug!(
            message_id = %message_id,
            status = %status,
            user_id = %connection.user_id,
            "Message status advanced"
        );
        self.backplane
            .publish(
                &user_group(sender_id),
                OutboundEvent::MessageStatusUpdate { message_id, status }.into_group_event()?,
            )
            .await
    }

    /// Fire-and-forget typing indicator; nothing persisted, nothing
    /// acknowledged.
    async fn presence(
        &self,
        connection: &ConnectionHandle,
        to_user_id: Uuid,
        typing: bool,
    ) -> AppResult<()> {
        let event = if typing {
            OutboundEvent::Typing {
                from_user_id: connection.user_id,
            }
        } else {
            OutboundEvent::StopTyping {
                from_user_id: connection.user_id,
            }
        };
        self.backplane
            .publish(&user_group(to_user_id), event.into_group_event()?)
            .await
    }

    /// Tears down a connection's group membership and registration.
    pub async fn disconnect(&self, connection_id: ConnectionId) {
        if let Err(e) = self.backplane.unsubscribe_all(connection_id).await {
            debug!(connection_id = %connection_id, error = %e, "Failed to leave groups");
        }
        self.manager.unregister(&connection_id);
    }
}
