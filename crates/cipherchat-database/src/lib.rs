//! # cipherchat-database
//!
//! PostgreSQL connection management and the concrete collaborator store
//! implementations (refresh sessions, messages, users), plus in-memory
//! counterparts used by tests and single-node development.

pub mod connection;
pub mod memory;
pub mod repositories;

pub use connection::DatabasePool;
