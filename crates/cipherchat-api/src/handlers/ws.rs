//! WebSocket upgrade with handshake authentication.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use cipherchat_auth::gate::{AuthOutcome, AuthRequest, GateMode};
use cipherchat_realtime::event::{InboundEvent, OutboundEvent};

use crate::error::ApiError;
use crate::state::AppState;

/// Handshake parameters carried in the query string.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Access credential.
    #[serde(default)]
    pub token: Option<String>,
    /// Refresh credential for expired-access recovery.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Stable device identifier.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Human-readable device name.
    #[serde(default)]
    pub device_name: Option<String>,
}

/// GET /ws — gate check, then upgrade.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let source_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|chain| chain.split(',').next().unwrap_or("").trim().to_string())
        .filter(|ip| !ip.is_empty());

    let outcome = state
        .gate
        .authenticate(AuthRequest {
            access_token: query.token,
            refresh_token: query.refresh_token,
            device_id: query.device_id.clone(),
            device_name: query.device_name,
            source_ip,
            mode: GateMode::Handshake,
            require_admin: false,
        })
        .await?;

    let device_id = query.device_id.unwrap_or_default();
    Ok(ws.on_upgrade(move |socket| handle_socket(state, outcome, device_id, socket)))
}

/// Drives one established connection: admission, outbound forwarding,
/// inbound dispatch, teardown.
async fn handle_socket(state: AppState, outcome: AuthOutcome, device_id: String, socket: WebSocket) {
    let (outbound_tx, mut outbound_rx) =
        mpsc::channel(state.config.realtime.channel_buffer_size);

    let handle = match state
        .engine
        .admit(&outcome.identity, &device_id, outbound_tx)
        .await
    {
        Ok(handle) => handle,
        Err(e) => {
            warn!(user_id = %outcome.identity.user_id, error = %e, "Admission failed");
            return;
        }
    };
    let connection_id = handle.id;
    info!(
        connection_id = %connection_id,
        user_id = %outcome.identity.user_id,
        "WebSocket connection established"
    );

    // The handshake may have refreshed credentials; hand them to the
    // client before anything else happens on this socket.
    if let Some(renewed) = outcome.renewed {
        let tokens = OutboundEvent::Tokens {
            access_token: renewed.access_token,
            access_expires_at: renewed.access_expires_at,
            refresh_token: renewed.refresh_token,
            refresh_expires_at: renewed.refresh_expires_at,
        };
        match tokens.into_group_event() {
            Ok(event) => {
                handle.send(event);
            }
            Err(e) => warn!(connection_id = %connection_id, error = %e, "Failed to encode tokens event"),
        }
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    let outbound_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&event.payload) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize outbound event");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let event = match serde_json::from_str::<InboundEvent>(text.as_str()) {
                    Ok(event) => event,
                    Err(e) => {
                        debug!(connection_id = %connection_id, error = %e, "Unparseable inbound event");
                        send_error(
                            &handle,
                            "INVALID_ENVELOPE",
                            "Unrecognized or malformed event",
                        );
                        continue;
                    }
                };
                if let Err(e) = state.engine.handle_event(&handle, event).await {
                    debug!(connection_id = %connection_id, error = %e, "Event rejected");
                    send_error(&handle, &e.kind.to_string(), &e.message);
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // pings are answered by axum
            Err(e) => {
                warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    outbound_task.abort();
    state.engine.disconnect(connection_id).await;
    info!(connection_id = %connection_id, "WebSocket connection closed");
}

fn send_error(handle: &cipherchat_realtime::ConnectionHandle, code: &str, message: &str) {
    let event = OutboundEvent::Error {
        code: code.to_string(),
        message: message.to_string(),
    };
    if let Ok(event) = event.into_group_event() {
        handle.send(event);
    }
}
