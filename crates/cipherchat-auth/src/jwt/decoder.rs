//! Credential verification with per-class keys.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use thiserror::Error;

use cipherchat_core::config::AuthConfig;

use super::claims::{Claims, TokenType};

/// Verification failure split into the only two outcomes the gate cares
/// about.
///
/// `Expired` is the single recoverable error: an expired access
/// credential may still be refreshed. Everything else (bad signature,
/// wrong key class, malformed payload) is `Invalid` and terminal for the
/// current request.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The credential was well-formed and correctly signed but past its
    /// expiration.
    #[error("credential expired")]
    Expired,
    /// The credential failed signature, key-class, or payload validation.
    #[error("invalid credential: {0}")]
    Invalid(String),
}

/// Verifies access and refresh credentials.
#[derive(Clone)]
pub struct CredentialDecoder {
    /// HMAC key for access credentials.
    access_key: DecodingKey,
    /// HMAC key for refresh credentials.
    refresh_key: DecodingKey,
    /// Shared validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for CredentialDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl CredentialDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // 5 seconds leeway for clock skew

        Self {
            access_key: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_key: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            validation,
        }
    }

    /// Verifies an access credential.
    pub fn verify_access(&self, token: &str) -> Result<Claims, CredentialError> {
        self.verify(token, &self.access_key, TokenType::Access)
    }

    /// Verifies a refresh credential.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, CredentialError> {
        self.verify(token, &self.refresh_key, TokenType::Refresh)
    }

    fn verify(
        &self,
        token: &str,
        key: &DecodingKey,
        expected: TokenType,
    ) -> Result<Claims, CredentialError> {
        let data = decode::<Claims>(token, key, &self.validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => CredentialError::Expired,
            _ => CredentialError::Invalid(e.to_string()),
        })?;

        // An access token signed under the access key can still be
        // replayed at a refresh endpoint if the secrets are misconfigured
        // to the same value; the embedded class closes that hole.
        if data.claims.token_type != expected {
            return Err(CredentialError::Invalid(format!(
                "wrong credential class: expected {expected:?}"
            )));
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::encoder::CredentialEncoder;
    use cipherchat_entity::identity::{Identity, UserRole};
    use uuid::Uuid;

    fn identity() -> Identity {
        Identity::new(Uuid::new_v4(), "+15550001111".to_string(), UserRole::User)
    }

    fn config() -> AuthConfig {
        AuthConfig {
            access_secret: "access-secret".to_string(),
            refresh_secret: "refresh-secret".to_string(),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn round_trips_access_credential() {
        let config = config();
        let encoder = CredentialEncoder::new(&config);
        let decoder = CredentialDecoder::new(&config);

        let identity = identity();
        let (token, _) = encoder.issue_access(&identity).unwrap();
        let claims = decoder.verify_access(&token).unwrap();
        assert_eq!(claims.sub, identity.user_id);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn rejects_access_credential_presented_as_refresh() {
        let config = config();
        let encoder = CredentialEncoder::new(&config);
        let decoder = CredentialDecoder::new(&config);

        let (token, _) = encoder.issue_access(&identity()).unwrap();
        // Signed under the access key, so the refresh key rejects the
        // signature outright rather than reporting expiry.
        assert!(matches!(
            decoder.verify_refresh(&token),
            Err(CredentialError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_tampered_credential() {
        let config = config();
        let encoder = CredentialEncoder::new(&config);
        let decoder = CredentialDecoder::new(&config);

        let (token, _) = encoder.issue_access(&identity()).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(
            decoder.verify_access(&tampered),
            Err(CredentialError::Invalid(_))
        ));
    }

    #[test]
    fn wrong_class_under_same_secret_is_invalid() {
        let config = AuthConfig {
            access_secret: "shared".to_string(),
            refresh_secret: "shared".to_string(),
            ..AuthConfig::default()
        };
        let encoder = CredentialEncoder::new(&config);
        let decoder = CredentialDecoder::new(&config);

        let (token, _) = encoder.issue_access(&identity()).unwrap();
        assert!(matches!(
            decoder.verify_refresh(&token),
            Err(CredentialError::Invalid(_))
        ));
    }
}
