//! Session authentication gate.
//!
//! One algorithm serves both transport shapes: request/response calls
//! (one-shot) and persistent connection handshakes. Adapters normalize
//! their inputs into an [`AuthRequest`] and convey the [`AuthOutcome`]
//! back in their own way; the validation logic never differs.

pub mod request;
pub mod session_gate;

pub use request::{AuthOutcome, AuthRequest, GateMode, RenewedCredentials};
pub use session_gate::SessionGate;
