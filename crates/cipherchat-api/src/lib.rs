//! # cipherchat-api
//!
//! HTTP API layer for CipherChat built on Axum.
//!
//! Provides the login flow that creates refresh sessions, the
//! authenticated one-shot routes behind the gate middleware, the
//! WebSocket upgrade with handshake authentication, and error mapping.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
