//! Real-time delivery engine for CipherChat.
//!
//! Binds authenticated connections to per-user broadcast groups, replays
//! pending ciphertext on reconnect, and drives the message status state
//! machine. Cross-process fan-out goes through the [`Backplane`] trait;
//! the engine itself holds no process-wide state beyond its injected
//! handles.
//!
//! [`Backplane`]: cipherchat_core::traits::Backplane

pub mod backplane;
pub mod connection;
pub mod engine;
pub mod event;

pub use backplane::LocalBackplane;
pub use connection::{ConnectionHandle, ConnectionId, ConnectionManager, ConnectionPool};
pub use engine::DeliveryEngine;
pub use event::{InboundEvent, OutboundEvent};
