//! User directory contract.

use async_trait::async_trait;

use cipherchat_entity::user::User;

use crate::result::AppResult;

/// Device metadata captured at login.
///
/// The device id binds the refresh session, not the account, so only
/// the human-facing summary lands on the user row.
#[derive(Debug, Clone)]
pub struct DeviceRegistration {
    /// Human-readable device name.
    pub device_name: String,
    /// IP the login originated from.
    pub last_ip: Option<String>,
    /// Client-published public key.
    pub public_key: String,
    /// Push notification token.
    pub push_token: String,
}

/// Lookup/registration surface of the user collaborator store.
///
/// The gate and delivery core never call this directly; only the login
/// flow that produces refresh sessions does.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Finds a user by phone number.
    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>>;

    /// Creates the user if absent, otherwise updates their device info.
    async fn create_or_update_device(
        &self,
        phone: &str,
        registration: DeviceRegistration,
    ) -> AppResult<User>;
}
