//! Credential minting with per-class signing keys.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use cipherchat_core::config::AuthConfig;
use cipherchat_core::error::AppError;
use cipherchat_entity::identity::Identity;

use super::claims::{Claims, TokenType};

/// Mints signed access and refresh credentials.
///
/// Access credentials carry a fixed TTL from configuration; refresh TTL
/// is supplied per call because new-session issuance and rotation share
/// this path.
#[derive(Clone)]
pub struct CredentialEncoder {
    /// HMAC key for access credentials.
    access_key: EncodingKey,
    /// HMAC key for refresh credentials.
    refresh_key: EncodingKey,
    /// Access credential TTL in minutes.
    access_ttl_minutes: i64,
}

impl std::fmt::Debug for CredentialEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialEncoder")
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .finish()
    }
}

impl CredentialEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_key: EncodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_key: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl_minutes: config.access_ttl_minutes as i64,
        }
    }

    /// Mints an access credential for the given identity.
    pub fn issue_access(&self, identity: &Identity) -> Result<(String, DateTime<Utc>), AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(self.access_ttl_minutes);
        let claims = self.claims(identity, now, expires_at, TokenType::Access);

        let token = encode(&Header::default(), &claims, &self.access_key)
            .map_err(|e| AppError::internal(format!("Failed to encode access credential: {e}")))?;

        Ok((token, expires_at))
    }

    /// Mints a refresh credential with the given TTL in days.
    pub fn issue_refresh(
        &self,
        identity: &Identity,
        ttl_days: u64,
    ) -> Result<(String, DateTime<Utc>), AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::days(ttl_days as i64);
        let claims = self.claims(identity, now, expires_at, TokenType::Refresh);

        let token = encode(&Header::default(), &claims, &self.refresh_key)
            .map_err(|e| AppError::internal(format!("Failed to encode refresh credential: {e}")))?;

        Ok((token, expires_at))
    }

    fn claims(
        &self,
        identity: &Identity,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        token_type: TokenType,
    ) -> Claims {
        Claims {
            sub: identity.user_id,
            phone: identity.phone.clone(),
            role: identity.role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        }
    }
}
