//! End-to-end checks of the session authentication gate against the
//! in-memory session store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header};
use uuid::Uuid;

use cipherchat_auth::gate::{AuthRequest, GateMode, SessionGate};
use cipherchat_auth::jwt::{Claims, CredentialEncoder, TokenType};
use cipherchat_core::config::AuthConfig;
use cipherchat_core::error::ErrorKind;
use cipherchat_core::traits::session_store::{SessionStore, SessionUpsert};
use cipherchat_database::memory::MemorySessionStore;
use cipherchat_entity::identity::{Identity, UserRole};

fn test_config() -> AuthConfig {
    AuthConfig {
        access_secret: "test-access-secret".to_string(),
        refresh_secret: "test-refresh-secret".to_string(),
        ..AuthConfig::default()
    }
}

fn test_identity() -> Identity {
    Identity::new(Uuid::new_v4(), "+15550001111".to_string(), UserRole::User)
}

struct Fixture {
    gate: SessionGate,
    encoder: CredentialEncoder,
    sessions: Arc<MemorySessionStore>,
    config: AuthConfig,
}

fn fixture() -> Fixture {
    fixture_with(test_config())
}

fn fixture_with(config: AuthConfig) -> Fixture {
    let sessions = Arc::new(MemorySessionStore::new());
    let gate = SessionGate::new(&config, sessions.clone());
    let encoder = CredentialEncoder::new(&config);
    Fixture {
        gate,
        encoder,
        sessions,
        config,
    }
}

impl Fixture {
    /// Issues a refresh credential and stores a matching session with
    /// the given expiry.
    async fn establish_session(
        &self,
        identity: &Identity,
        days_until_expiry: i64,
    ) -> String {
        let (token, _) = self
            .encoder
            .issue_refresh(identity, self.config.refresh_ttl_days)
            .unwrap();
        self.sessions
            .upsert(SessionUpsert {
                user_id: identity.user_id,
                token: token.clone(),
                device_id: "device-1".to_string(),
                device_name: "Pixel 9".to_string(),
                last_ip: Some("10.0.0.1".to_string()),
                expires_at: Utc::now() + Duration::days(days_until_expiry),
            })
            .await
            .unwrap();
        token
    }

    /// Mints an access credential that expired an hour ago.
    fn expired_access(&self, identity: &Identity) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.user_id,
            phone: identity.phone.clone(),
            role: identity.role,
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
            jti: Uuid::new_v4(),
            token_type: TokenType::Access,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.access_secret.as_bytes()),
        )
        .unwrap()
    }

    /// Mints a refresh credential that expired an hour ago.
    fn expired_refresh(&self, identity: &Identity) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.user_id,
            phone: identity.phone.clone(),
            role: identity.role,
            iat: (now - Duration::days(31)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
            jti: Uuid::new_v4(),
            token_type: TokenType::Refresh,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.refresh_secret.as_bytes()),
        )
        .unwrap()
    }

    fn request(&self) -> AuthRequest {
        AuthRequest {
            access_token: None,
            refresh_token: None,
            device_id: Some("device-1".to_string()),
            device_name: Some("Pixel 9".to_string()),
            source_ip: Some("10.0.0.1".to_string()),
            mode: GateMode::OneShot,
            require_admin: false,
        }
    }
}

#[tokio::test]
async fn missing_device_info_rejects_and_drops_presented_session() {
    let f = fixture();
    let identity = test_identity();
    let refresh = f.establish_session(&identity, 30).await;

    let mut request = f.request();
    request.device_id = None;
    request.refresh_token = Some(refresh);

    let err = f.gate.authenticate(request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingDeviceInfo);
    assert!(f.sessions.is_empty().await);
}

#[tokio::test]
async fn missing_credentials_purges_device_sessions_in_one_shot_mode() {
    let f = fixture();
    let identity = test_identity();
    f.establish_session(&identity, 30).await;

    let err = f.gate.authenticate(f.request()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingCredentials);
    assert!(f.sessions.is_empty().await);
}

#[tokio::test]
async fn missing_credentials_leaves_sessions_alone_in_handshake_mode() {
    let f = fixture();
    let identity = test_identity();
    f.establish_session(&identity, 30).await;

    let mut request = f.request();
    request.mode = GateMode::Handshake;

    let err = f.gate.authenticate(request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingCredentials);
    assert_eq!(f.sessions.len().await, 1);
}

#[tokio::test]
async fn valid_access_credential_short_circuits() {
    let f = fixture();
    let identity = test_identity();
    let (access, _) = f.encoder.issue_access(&identity).unwrap();

    let mut request = f.request();
    request.access_token = Some(access);

    let outcome = f.gate.authenticate(request).await.unwrap();
    assert_eq!(outcome.identity.user_id, identity.user_id);
    assert!(outcome.renewed.is_none());
}

#[tokio::test]
async fn tampered_access_credential_is_terminal_despite_valid_refresh() {
    let f = fixture();
    let identity = test_identity();
    let refresh = f.establish_session(&identity, 30).await;
    let (access, _) = f.encoder.issue_access(&identity).unwrap();

    let mut request = f.request();
    request.access_token = Some(format!("{access}x"));
    request.refresh_token = Some(refresh);

    let err = f.gate.authenticate(request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidAccessCredential);
}

#[tokio::test]
async fn expired_access_without_refresh_requires_refresh() {
    let f = fixture();
    let identity = test_identity();

    let mut request = f.request();
    request.access_token = Some(f.expired_access(&identity));

    let err = f.gate.authenticate(request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RefreshRequired);
}

#[tokio::test]
async fn expired_access_with_valid_refresh_mints_new_access() {
    let f = fixture();
    let identity = test_identity();
    let refresh = f.establish_session(&identity, 30).await;

    let mut request = f.request();
    request.access_token = Some(f.expired_access(&identity));
    request.refresh_token = Some(refresh.clone());

    let outcome = f.gate.authenticate(request).await.unwrap();
    assert_eq!(outcome.identity.user_id, identity.user_id);

    let renewed = outcome.renewed.expect("refresh path always renews access");
    assert!(!renewed.access_token.is_empty());
    // Far from the rotation threshold, so the refresh token stays put.
    assert!(renewed.refresh_token.is_none());
    let session = f.sessions.find_by_user(identity.user_id).await.unwrap();
    assert_eq!(session.token, refresh);
}

#[tokio::test]
async fn refresh_without_access_credential_succeeds() {
    let f = fixture();
    let identity = test_identity();
    let refresh = f.establish_session(&identity, 30).await;

    let mut request = f.request();
    request.refresh_token = Some(refresh);

    let outcome = f.gate.authenticate(request).await.unwrap();
    assert!(outcome.renewed.is_some());
}

#[tokio::test]
async fn unknown_refresh_token_is_session_not_found() {
    let f = fixture();
    let identity = test_identity();
    let (orphan, _) = f
        .encoder
        .issue_refresh(&identity, f.config.refresh_ttl_days)
        .unwrap();

    let mut request = f.request();
    request.refresh_token = Some(orphan);

    let err = f.gate.authenticate(request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::SessionNotFound);
}

#[tokio::test]
async fn device_id_mismatch_deletes_session() {
    let f = fixture();
    let identity = test_identity();
    let refresh = f.establish_session(&identity, 30).await;

    let mut request = f.request();
    request.refresh_token = Some(refresh);
    request.device_id = Some("device-2".to_string());

    let err = f.gate.authenticate(request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::DeviceMismatch);
    assert!(f.sessions.is_empty().await);
}

#[tokio::test]
async fn device_name_mismatch_deletes_session() {
    let f = fixture();
    let identity = test_identity();
    let refresh = f.establish_session(&identity, 30).await;

    let mut request = f.request();
    request.refresh_token = Some(refresh);
    request.device_name = Some("Galaxy S25".to_string());

    let err = f.gate.authenticate(request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::DeviceNameMismatch);
    assert!(f.sessions.is_empty().await);
}

#[tokio::test]
async fn user_mismatch_outranks_device_mismatch() {
    let f = fixture();
    let owner = test_identity();
    let intruder = test_identity();
    // A refresh credential minted for a different user than the session
    // it resolves to. Forge the store state directly.
    let (token, _) = f
        .encoder
        .issue_refresh(&intruder, f.config.refresh_ttl_days)
        .unwrap();
    f.sessions
        .upsert(SessionUpsert {
            user_id: owner.user_id,
            token: token.clone(),
            device_id: "other-device".to_string(),
            device_name: "Other".to_string(),
            last_ip: None,
            expires_at: Utc::now() + Duration::days(30),
        })
        .await
        .unwrap();

    let mut request = f.request();
    request.refresh_token = Some(token);

    let err = f.gate.authenticate(request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::SessionUserMismatch);
    assert!(f.sessions.is_empty().await);
}

#[tokio::test]
async fn ip_mismatch_rejects_only_when_enforced() {
    let mut config = test_config();
    config.enforce_ip_binding = true;
    let f = fixture_with(config);
    let identity = test_identity();
    let refresh = f.establish_session(&identity, 30).await;

    let mut request = f.request();
    request.refresh_token = Some(refresh);
    request.source_ip = Some("192.168.1.50".to_string());

    let err = f.gate.authenticate(request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::IpMismatch);
    assert!(f.sessions.is_empty().await);
}

#[tokio::test]
async fn ip_mismatch_ignored_by_default_policy() {
    let f = fixture();
    let identity = test_identity();
    let refresh = f.establish_session(&identity, 30).await;

    let mut request = f.request();
    request.refresh_token = Some(refresh);
    request.source_ip = Some("192.168.1.50".to_string());

    assert!(f.gate.authenticate(request).await.is_ok());
}

#[tokio::test]
async fn expired_refresh_credential_burns_its_session() {
    let f = fixture();
    let identity = test_identity();
    // The stored session is still valid; only the credential itself is
    // past its exp claim.
    let token = f.expired_refresh(&identity);
    f.sessions
        .upsert(SessionUpsert {
            user_id: identity.user_id,
            token: token.clone(),
            device_id: "device-1".to_string(),
            device_name: "Pixel 9".to_string(),
            last_ip: None,
            expires_at: Utc::now() + Duration::days(30),
        })
        .await
        .unwrap();

    let mut request = f.request();
    request.refresh_token = Some(token);

    let err = f.gate.authenticate(request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RefreshExpired);
    assert!(f.sessions.is_empty().await);
}

#[tokio::test]
async fn expired_session_deletes_and_rejects() {
    let f = fixture();
    let identity = test_identity();
    let refresh = f.establish_session(&identity, -1).await;

    let mut request = f.request();
    request.refresh_token = Some(refresh);

    let err = f.gate.authenticate(request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RefreshExpired);
    assert!(f.sessions.is_empty().await);
}

#[tokio::test]
async fn refresh_near_expiry_rotates_with_fresh_ttl() {
    let f = fixture();
    let identity = test_identity();
    let refresh = f.establish_session(&identity, 3).await;

    let mut request = f.request();
    request.refresh_token = Some(refresh.clone());

    let outcome = f.gate.authenticate(request).await.unwrap();
    let renewed = outcome.renewed.unwrap();
    let rotated = renewed.refresh_token.expect("rotation should fire at 3 days left");
    assert_ne!(rotated, refresh);

    let session = f.sessions.find_by_user(identity.user_id).await.unwrap();
    assert_eq!(session.token, rotated);
    // Fresh 30-day TTL, not the old 3-day remainder.
    assert!(session.remaining() > Duration::days(29));
}

#[tokio::test]
async fn refresh_far_from_expiry_does_not_rotate() {
    let f = fixture();
    let identity = test_identity();
    let refresh = f.establish_session(&identity, 20).await;

    let mut request = f.request();
    request.refresh_token = Some(refresh.clone());

    let outcome = f.gate.authenticate(request).await.unwrap();
    assert!(outcome.renewed.unwrap().refresh_token.is_none());
}

#[tokio::test]
async fn refresh_updates_last_used_bookkeeping() {
    let f = fixture();
    let identity = test_identity();
    let refresh = f.establish_session(&identity, 30).await;
    let before = f
        .sessions
        .find_by_user(identity.user_id)
        .await
        .unwrap()
        .last_used_at;

    let mut request = f.request();
    request.refresh_token = Some(refresh);
    request.source_ip = Some("10.9.9.9".to_string());

    f.gate.authenticate(request).await.unwrap();

    let session = f.sessions.find_by_user(identity.user_id).await.unwrap();
    assert!(session.last_used_at >= before);
    assert_eq!(session.device.last_ip.as_deref(), Some("10.9.9.9"));
}

#[tokio::test]
async fn admin_requirement_rejects_plain_users_on_both_paths() {
    let f = fixture();
    let identity = test_identity();
    let refresh = f.establish_session(&identity, 30).await;

    let (access, _) = f.encoder.issue_access(&identity).unwrap();
    let mut direct = f.request();
    direct.access_token = Some(access);
    direct.require_admin = true;
    let err = f.gate.authenticate(direct).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ForbiddenRole);

    let mut refreshed = f.request();
    refreshed.refresh_token = Some(refresh);
    refreshed.require_admin = true;
    let err = f.gate.authenticate(refreshed).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ForbiddenRole);
}

#[tokio::test]
async fn admin_identity_passes_role_gate() {
    let f = fixture();
    let admin = Identity::new(Uuid::new_v4(), "+15559990000".to_string(), UserRole::Admin);
    let (access, _) = f.encoder.issue_access(&admin).unwrap();

    let mut request = f.request();
    request.access_token = Some(access);
    request.require_admin = true;

    let outcome = f.gate.authenticate(request).await.unwrap();
    assert!(outcome.identity.role.is_admin());
}

#[tokio::test]
async fn handshake_and_one_shot_agree_on_refresh_outcome() {
    let f = fixture();
    let identity = test_identity();
    let refresh = f.establish_session(&identity, 30).await;

    let mut one_shot = f.request();
    one_shot.refresh_token = Some(refresh.clone());
    let a = f.gate.authenticate(one_shot).await.unwrap();

    let mut handshake = f.request();
    handshake.refresh_token = Some(refresh);
    handshake.mode = GateMode::Handshake;
    let b = f.gate.authenticate(handshake).await.unwrap();

    assert_eq!(a.identity.user_id, b.identity.user_id);
    assert_eq!(a.renewed.is_some(), b.renewed.is_some());
}
