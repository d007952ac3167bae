//! In-memory collaborator store implementations.
//!
//! Functionally equivalent to the PostgreSQL repositories for a single
//! process: same invariants (one session per user, unique tokens,
//! set-if-higher status transitions), no persistence. Used by tests and
//! single-node development.

pub mod message;
pub mod session;
pub mod user;

pub use message::MemoryMessageStore;
pub use session::MemorySessionStore;
pub use user::MemoryUserDirectory;
