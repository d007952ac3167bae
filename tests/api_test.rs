//! Integration tests for the HTTP surface, running the full router
//! against in-memory stores.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use cipherchat_api::state::AppState;
use cipherchat_auth::gate::SessionGate;
use cipherchat_auth::jwt::CredentialEncoder;
use cipherchat_core::config::auth::AuthConfig;
use cipherchat_core::config::{AppConfig, DatabaseConfig};
use cipherchat_database::memory::{MemoryMessageStore, MemorySessionStore, MemoryUserDirectory};
use cipherchat_realtime::connection::{ConnectionManager, ConnectionPool};
use cipherchat_realtime::{DeliveryEngine, LocalBackplane};

/// Test application context.
struct TestApp {
    /// The Axum router for making test requests.
    router: Router,
    /// Session store for direct inspection.
    sessions: Arc<MemorySessionStore>,
}

/// Decoded test response.
struct TestResponse {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Value,
}

impl TestApp {
    fn new() -> Self {
        let config = AppConfig {
            server: Default::default(),
            database: DatabaseConfig {
                url: "postgres://unused".to_string(),
                max_connections: 1,
                min_connections: 1,
                connect_timeout_seconds: 1,
            },
            auth: AuthConfig {
                access_secret: "test-access-secret".to_string(),
                refresh_secret: "test-refresh-secret".to_string(),
                ..AuthConfig::default()
            },
            session: Default::default(),
            realtime: Default::default(),
            logging: Default::default(),
        };

        let sessions = Arc::new(MemorySessionStore::new());
        let messages = Arc::new(MemoryMessageStore::new());
        let users = Arc::new(MemoryUserDirectory::new());

        let gate = Arc::new(SessionGate::new(&config.auth, sessions.clone()));
        let encoder = Arc::new(CredentialEncoder::new(&config.auth));

        let pool = Arc::new(ConnectionPool::new());
        let backplane = Arc::new(LocalBackplane::new(pool.clone()));
        let manager = Arc::new(ConnectionManager::new(
            pool,
            config.realtime.max_connections_per_user,
        ));
        let engine = Arc::new(DeliveryEngine::new(
            messages,
            backplane,
            manager,
            &config.realtime,
        ));

        let state = AppState {
            config: Arc::new(config),
            gate,
            engine,
            encoder,
            users,
            sessions: sessions.clone(),
        };

        Self {
            router: cipherchat_api::build_router(state),
            sessions,
        }
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn login(&self, phone: &str, device_id: &str, device_name: &str) -> Value {
        let response = self
            .request(
                "POST",
                "/api/auth/login",
                Some(serde_json::json!({
                    "phone": phone,
                    "device_id": device_id,
                    "device_name": device_name,
                    "public_key": "pk-base64",
                    "push_token": "push-1",
                })),
                &[],
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
        response.body
    }
}

#[tokio::test]
async fn login_issues_credentials_and_a_session() {
    let app = TestApp::new();
    let body = app.login("+15550001111", "device-1", "Pixel 9").await;

    assert!(body.get("access_token").is_some());
    assert!(body.get("refresh_token").is_some());
    assert_eq!(body["user"]["phone"], "+15550001111");
    assert_eq!(app.sessions.len().await, 1);
}

#[tokio::test]
async fn second_login_supersedes_the_first_session() {
    let app = TestApp::new();
    app.login("+15550001111", "device-1", "Pixel 9").await;
    app.login("+15550001111", "device-2", "Galaxy S25").await;

    assert_eq!(app.sessions.len().await, 1);
    let user_id = {
        let body = app.login("+15550001111", "device-3", "iPhone 17").await;
        uuid::Uuid::parse_str(body["user"]["id"].as_str().unwrap()).unwrap()
    };
    let session = app.sessions.find_by_user(user_id).await.unwrap();
    assert_eq!(session.device.device_id, "device-3");
}

#[tokio::test]
async fn login_rejects_blank_phone() {
    let app = TestApp::new();
    let response = app
        .request(
            "POST",
            "/api/auth/login",
            Some(serde_json::json!({
                "phone": " ",
                "device_id": "device-1",
                "device_name": "Pixel 9",
                "public_key": "pk",
                "push_token": "push",
            })),
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn me_returns_identity_for_valid_access() {
    let app = TestApp::new();
    let body = app.login("+15550001111", "device-1", "Pixel 9").await;
    let access = body["access_token"].as_str().unwrap();

    let response = app
        .request(
            "GET",
            "/api/auth/me",
            None,
            &[
                ("authorization", &format!("Bearer {access}")),
                ("x-device-id", "device-1"),
                ("x-device-name", "Pixel 9"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["phone"], "+15550001111");
}

#[tokio::test]
async fn missing_device_info_maps_to_bad_request() {
    let app = TestApp::new();
    let response = app.request("GET", "/api/auth/me", None, &[]).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "MISSING_DEVICE_INFO");
}

#[tokio::test]
async fn missing_credentials_maps_to_unauthorized() {
    let app = TestApp::new();
    let response = app
        .request(
            "GET",
            "/api/auth/me",
            None,
            &[("x-device-id", "device-1"), ("x-device-name", "Pixel 9")],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "MISSING_CREDENTIALS");
    assert_eq!(response.body["retryable"], false);
}

#[tokio::test]
async fn refresh_flow_surfaces_new_access_in_response_headers() {
    let app = TestApp::new();
    let body = app.login("+15550001111", "device-1", "Pixel 9").await;
    let refresh = body["refresh_token"].as_str().unwrap();

    // No access credential at all forces the refresh path.
    let response = app
        .request(
            "GET",
            "/api/auth/me",
            None,
            &[
                ("x-refresh-token", refresh),
                ("x-device-id", "device-1"),
                ("x-device-name", "Pixel 9"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers.get("x-access-token").is_some());
    // Fresh 30-day session, so no rotation.
    assert!(response.headers.get("x-refresh-token").is_none());
}

#[tokio::test]
async fn refresh_with_wrong_device_is_rejected_with_its_own_code() {
    let app = TestApp::new();
    let body = app.login("+15550001111", "device-1", "Pixel 9").await;
    let refresh = body["refresh_token"].as_str().unwrap();

    let response = app
        .request(
            "GET",
            "/api/auth/me",
            None,
            &[
                ("x-refresh-token", refresh),
                ("x-device-id", "device-9"),
                ("x-device-name", "Pixel 9"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "DEVICE_MISMATCH");

    // The binding failure burned the session.
    let retry = app
        .request(
            "GET",
            "/api/auth/me",
            None,
            &[
                ("x-refresh-token", refresh),
                ("x-device-id", "device-1"),
                ("x-device-name", "Pixel 9"),
            ],
        )
        .await;
    assert_eq!(retry.body["error"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn logout_deletes_the_session() {
    let app = TestApp::new();
    let body = app.login("+15550001111", "device-1", "Pixel 9").await;
    let access = body["access_token"].as_str().unwrap();
    let refresh = body["refresh_token"].as_str().unwrap();

    let response = app
        .request(
            "POST",
            "/api/auth/logout",
            None,
            &[
                ("authorization", &format!("Bearer {access}")),
                ("x-refresh-token", refresh),
                ("x-device-id", "device-1"),
                ("x-device-name", "Pixel 9"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(app.sessions.is_empty().await);
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let response = app.request("GET", "/api/health", None, &[]).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}
