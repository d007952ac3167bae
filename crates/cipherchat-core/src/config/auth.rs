//! Credential and authentication gate configuration.

use serde::{Deserialize, Serialize};

/// Credential codec and gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for access credential signing (HMAC-SHA256).
    #[serde(default = "default_access_secret")]
    pub access_secret: String,
    /// Secret key for refresh credential signing (HMAC-SHA256).
    ///
    /// Kept separate from the access secret so that an access token can
    /// never be replayed as a refresh token.
    #[serde(default = "default_refresh_secret")]
    pub refresh_secret: String,
    /// Access credential TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_minutes: u64,
    /// Refresh credential TTL in days for new and rotated sessions.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_days: u64,
    /// Remaining-lifetime threshold in days at or below which a refresh
    /// credential is rotated during the refresh flow.
    #[serde(default = "default_rotation_threshold")]
    pub rotation_threshold_days: u64,
    /// Whether an IP mismatch against the stored binding invalidates the
    /// refresh session. Deployment policy, off by default.
    #[serde(default)]
    pub enforce_ip_binding: bool,
    /// Timeout in seconds for essential session store reads; elapsed
    /// lookups map to a retryable store-unavailable error.
    #[serde(default = "default_store_timeout")]
    pub store_timeout_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: default_access_secret(),
            refresh_secret: default_refresh_secret(),
            access_ttl_minutes: default_access_ttl(),
            refresh_ttl_days: default_refresh_ttl(),
            rotation_threshold_days: default_rotation_threshold(),
            enforce_ip_binding: false,
            store_timeout_seconds: default_store_timeout(),
        }
    }
}

fn default_access_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_refresh_secret() -> String {
    "CHANGE_ME_TOO_IN_PRODUCTION".to_string()
}

fn default_access_ttl() -> u64 {
    15
}

fn default_refresh_ttl() -> u64 {
    30
}

fn default_rotation_threshold() -> u64 {
    7
}

fn default_store_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let config = AuthConfig::default();
        assert_eq!(config.access_ttl_minutes, 15);
        assert_eq!(config.refresh_ttl_days, 30);
        assert_eq!(config.rotation_threshold_days, 7);
        assert!(!config.enforce_ip_binding);
    }
}
