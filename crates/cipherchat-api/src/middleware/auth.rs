//! One-shot gate adapter for HTTP routes.
//!
//! Translates request headers into a normalized gate invocation and the
//! outcome back into the response: the identity lands in a request
//! extension, renewed credentials in `x-access-token` /
//! `x-refresh-token` response headers.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use cipherchat_auth::gate::{AuthRequest, GateMode};
use cipherchat_entity::identity::Identity;

use crate::error::ApiError;
use crate::state::AppState;

/// Identity attached to every authenticated request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The authenticated identity.
    pub identity: Identity,
    /// The refresh credential the request presented, if any.
    pub refresh_token: Option<String>,
}

/// Middleware running the gate for every request on protected routes.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = request.headers();
    let refresh_token = header_value(headers, "x-refresh-token");

    let gate_request = AuthRequest {
        access_token: bearer_token(headers),
        refresh_token: refresh_token.clone(),
        device_id: header_value(headers, "x-device-id"),
        device_name: header_value(headers, "x-device-name"),
        source_ip: source_ip(headers),
        mode: GateMode::OneShot,
        require_admin: false,
    };

    let outcome = state.gate.authenticate(gate_request).await?;
    request.extensions_mut().insert(AuthContext {
        identity: outcome.identity,
        refresh_token,
    });

    let renewed = outcome.renewed;
    let mut response = next.run(request).await;

    // Surface renewed credentials so the client can swap them in
    // without a dedicated refresh round trip.
    if let Some(renewed) = renewed {
        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&renewed.access_token) {
            headers.insert("x-access-token", value);
        }
        if let Some(rotated) = &renewed.refresh_token
            && let Ok(value) = HeaderValue::from_str(rotated)
        {
            headers.insert("x-refresh-token", value);
        }
    }

    Ok(response)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Client-reported IP first, then the first hop of `x-forwarded-for`.
fn source_ip(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-device-ip").or_else(|| {
        header_value(headers, "x-forwarded-for")
            .map(|chain| chain.split(',').next().unwrap_or("").trim().to_string())
            .filter(|ip| !ip.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.1, 172.16.0.1"),
        );
        assert_eq!(source_ip(&headers).as_deref(), Some("10.0.0.1"));

        headers.insert("x-device-ip", HeaderValue::from_static("192.168.0.9"));
        assert_eq!(source_ip(&headers).as_deref(), Some("192.168.0.9"));
    }
}
