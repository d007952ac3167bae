//! Normalized gate input and output.

use chrono::{DateTime, Utc};

use cipherchat_entity::identity::Identity;

/// How the caller reached the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Request/response call; result conveyed inline.
    OneShot,
    /// Persistent connection handshake; result is accept/reject.
    Handshake,
}

/// Credentials and device metadata as presented by one invocation.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Access credential, if presented.
    pub access_token: Option<String>,
    /// Refresh credential, if presented.
    pub refresh_token: Option<String>,
    /// Stable client-generated device identifier.
    pub device_id: Option<String>,
    /// Human-readable device name.
    pub device_name: Option<String>,
    /// IP the request originated from, when the transport knows it.
    pub source_ip: Option<String>,
    /// Transport shape of this invocation.
    pub mode: GateMode,
    /// Whether the caller additionally requires the admin role.
    pub require_admin: bool,
}

impl AuthRequest {
    /// Builds a request with no credentials or device info.
    pub fn new(mode: GateMode) -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            device_id: None,
            device_name: None,
            source_ip: None,
            mode,
            require_admin: false,
        }
    }
}

/// Credentials minted during a refreshed success.
///
/// `access_token` is always present on the refresh path; the refresh
/// fields are set only when rotation fired and its persistence
/// succeeded.
#[derive(Debug, Clone)]
pub struct RenewedCredentials {
    /// Freshly minted access credential.
    pub access_token: String,
    /// Access credential expiry.
    pub access_expires_at: DateTime<Utc>,
    /// Rotated refresh credential, if rotation happened.
    pub refresh_token: Option<String>,
    /// Rotated refresh credential expiry.
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

/// Successful gate result.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    /// The authenticated identity.
    pub identity: Identity,
    /// Set when the refresh flow minted new credentials; `None` on a
    /// direct access-credential success.
    pub renewed: Option<RenewedCredentials>,
}
