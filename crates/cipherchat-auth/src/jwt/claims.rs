//! JWT claims structure shared by access and refresh credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cipherchat_entity::identity::{Identity, UserRole};

/// Claims payload embedded in every credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the user ID.
    pub sub: Uuid,
    /// Phone number the account was registered with.
    pub phone: String,
    /// User role at the time of issuance.
    pub role: UserRole,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Unique credential ID.
    pub jti: Uuid,
    /// Key class this credential was signed under.
    pub token_type: TokenType,
}

/// Distinguishes access credentials from refresh credentials.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived credential for API requests.
    Access,
    /// Long-lived credential backing a refresh session.
    Refresh,
}

impl Claims {
    /// Returns the identity carried by these claims.
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.sub,
            phone: self.phone.clone(),
            role: self.role,
        }
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Checks whether this credential has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_projection_preserves_fields() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            phone: "+15551234567".to_string(),
            role: UserRole::Admin,
            iat: 0,
            exp: i64::MAX,
            jti: Uuid::new_v4(),
            token_type: TokenType::Access,
        };
        let identity = claims.identity();
        assert_eq!(identity.user_id, claims.sub);
        assert_eq!(identity.phone, claims.phone);
        assert!(identity.role.is_admin());
        assert!(!claims.is_expired());
    }
}
