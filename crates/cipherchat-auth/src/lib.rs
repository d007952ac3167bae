//! Credential codec and session authentication gate for CipherChat.
//!
//! The `jwt` module mints and verifies access/refresh credentials with
//! separate HMAC keys per class. The `gate` module runs the device-bound
//! session check that both the HTTP middleware and the WebSocket
//! handshake funnel through. `cleanup` reaps expired refresh sessions in
//! the background.

pub mod cleanup;
pub mod gate;
pub mod jwt;

pub use cleanup::SessionCleanup;
pub use gate::{AuthOutcome, AuthRequest, GateMode, RenewedCredentials, SessionGate};
pub use jwt::{Claims, CredentialDecoder, CredentialEncoder};
