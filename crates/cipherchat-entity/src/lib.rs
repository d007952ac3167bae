//! # cipherchat-entity
//!
//! Domain entity models for CipherChat: identities, users, refresh
//! sessions with device bindings, and ciphertext message envelopes.
//!
//! This crate has **no** internal dependencies on other CipherChat crates.

pub mod identity;
pub mod message;
pub mod session;
pub mod user;

pub use identity::{Identity, UserRole};
pub use message::{Message, MessageStatus, NewMessage};
pub use session::{DeviceBinding, RefreshSession};
pub use user::User;
