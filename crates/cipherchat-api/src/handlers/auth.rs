//! Auth handlers: login, logout, me.

use axum::extract::State;
use axum::{Extension, Json};
use tracing::info;

use cipherchat_core::traits::{DeviceRegistration, SessionUpsert};

use crate::dto::request::LoginRequest;
use crate::dto::response::{LoginResponse, MessageResponse, ProfileResponse};
use crate::error::ApiError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

/// POST /api/auth/login
///
/// Finds or creates the account for the phone number, records the
/// device, and issues a fresh credential pair. The session upsert
/// supersedes whatever session the user held before, so a login on a
/// new device logs the old one out.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    req.validate()?;

    let user = state
        .users
        .create_or_update_device(
            &req.phone,
            DeviceRegistration {
                device_name: req.device_name.clone(),
                last_ip: req.last_ip.clone(),
                public_key: req.public_key.clone(),
                push_token: req.push_token.clone(),
            },
        )
        .await?;

    let identity = user.identity();
    let (access_token, access_expires_at) = state.encoder.issue_access(&identity)?;
    let (refresh_token, refresh_expires_at) = state
        .encoder
        .issue_refresh(&identity, state.config.auth.refresh_ttl_days)?;

    state
        .sessions
        .upsert(SessionUpsert {
            user_id: user.id,
            token: refresh_token.clone(),
            device_id: req.device_id,
            device_name: req.device_name,
            last_ip: req.last_ip,
            expires_at: refresh_expires_at,
        })
        .await?;

    info!(user_id = %user.id, "Login issued new session");

    Ok(Json(LoginResponse {
        access_token,
        access_expires_at,
        refresh_token,
        refresh_expires_at,
        user: ProfileResponse::from(&user),
    }))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<MessageResponse>, ApiError> {
    match ctx.refresh_token.as_deref() {
        Some(token) => state.sessions.delete_by_token(token).await?,
        // No refresh token on this request; fall back to dropping the
        // user's single session.
        None => state.sessions.delete_by_user(ctx.identity.user_id).await?,
    }

    info!(user_id = %ctx.identity.user_id, "Logged out");
    Ok(Json(MessageResponse::new("Logged out")))
}

/// GET /api/auth/me
pub async fn me(
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(serde_json::json!({
        "user_id": ctx.identity.user_id,
        "phone": ctx.identity.phone,
        "role": ctx.identity.role.to_string(),
    })))
}
