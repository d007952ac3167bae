//! The device-bound session check.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use cipherchat_core::config::AuthConfig;
use cipherchat_core::error::{AppError, ErrorKind};
use cipherchat_core::result::AppResult;
use cipherchat_core::traits::SessionStore;
use cipherchat_entity::identity::Identity;
use cipherchat_entity::session::RefreshSession;

use crate::jwt::{CredentialDecoder, CredentialEncoder, CredentialError};

use super::request::{AuthOutcome, AuthRequest, GateMode, RenewedCredentials};

/// Validates presented credentials against the refresh session binding.
///
/// A valid access credential short-circuits without touching the session
/// store. Otherwise the refresh flow loads the session, checks the
/// device binding field by field, and mints a fresh access credential.
/// Binding failures delete the session before rejecting so that a stolen
/// refresh token cannot be retried against a different device claim.
#[derive(Clone)]
pub struct SessionGate {
    encoder: CredentialEncoder,
    decoder: CredentialDecoder,
    sessions: Arc<dyn SessionStore>,
    refresh_ttl_days: u64,
    rotation_threshold: Duration,
    enforce_ip_binding: bool,
    store_timeout: StdDuration,
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("refresh_ttl_days", &self.refresh_ttl_days)
            .field("enforce_ip_binding", &self.enforce_ip_binding)
            .finish()
    }
}

impl SessionGate {
    /// Creates a gate over the given session store.
    pub fn new(config: &AuthConfig, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            encoder: CredentialEncoder::new(config),
            decoder: CredentialDecoder::new(config),
            sessions,
            refresh_ttl_days: config.refresh_ttl_days,
            rotation_threshold: Duration::days(config.rotation_threshold_days as i64),
            enforce_ip_binding: config.enforce_ip_binding,
            store_timeout: StdDuration::from_secs(config.store_timeout_seconds),
        }
    }

    /// Runs the full check for one invocation.
    ///
    /// Every rejection carries a distinct [`ErrorKind`] so adapters can
    /// map them to machine-readable codes; only `StoreUnavailable` is
    /// retryable.
    pub async fn authenticate(&self, request: AuthRequest) -> AppResult<AuthOutcome> {
        // Device info is mandatory before anything else. A client that
        // sends a refresh token without it is misconfigured; drop the
        // stale session it points at.
        let (Some(device_id), Some(device_name)) =
            (request.device_id.as_deref(), request.device_name.as_deref())
        else {
            if let Some(token) = request.refresh_token.as_deref() {
                self.delete_session_by_token(token).await;
            }
            return Err(AppError::rejection(
                ErrorKind::MissingDeviceInfo,
                "Device id and device name are required",
            ));
        };

        if request.access_token.is_none() && request.refresh_token.is_none() {
            // A fully unauthenticated device needs a fresh login; in
            // one-shot mode also purge whatever sessions it left behind.
            if request.mode == GateMode::OneShot {
                if let Err(e) = self.sessions.delete_by_device(device_id).await {
                    warn!(device_id, error = %e, "Failed to purge sessions for unauthenticated device");
                }
            }
            return Err(AppError::rejection(
                ErrorKind::MissingCredentials,
                "No credentials presented",
            ));
        }

        if let Some(access_token) = request.access_token.as_deref() {
            match self.decoder.verify_access(access_token) {
                Ok(claims) => {
                    let identity = claims.identity();
                    self.check_role(&identity, request.require_admin)?;
                    return Ok(AuthOutcome {
                        identity,
                        renewed: None,
                    });
                }
                Err(CredentialError::Invalid(reason)) => {
                    return Err(AppError::rejection(
                        ErrorKind::InvalidAccessCredential,
                        format!("Access credential rejected: {reason}"),
                    ));
                }
                Err(CredentialError::Expired) => {
                    debug!("Access credential expired, attempting refresh");
                }
            }
        }

        let Some(refresh_token) = request.refresh_token.as_deref() else {
            return Err(AppError::rejection(
                ErrorKind::RefreshRequired,
                "Access credential expired and no refresh credential presented",
            ));
        };

        let claims = match self.decoder.verify_refresh(refresh_token) {
            Ok(claims) => claims,
            Err(CredentialError::Invalid(reason)) => {
                return Err(AppError::rejection(
                    ErrorKind::InvalidRefreshCredential,
                    format!("Refresh credential rejected: {reason}"),
                ));
            }
            Err(CredentialError::Expired) => {
                self.delete_session_by_token(refresh_token).await;
                return Err(AppError::rejection(
                    ErrorKind::RefreshExpired,
                    "Refresh credential expired",
                ));
            }
        };

        let session = self
            .timed(self.sessions.find_by_token(refresh_token))
            .await?
            .ok_or_else(|| {
                AppError::rejection(ErrorKind::SessionNotFound, "No session for refresh credential")
            })?;

        self.check_binding(&session, claims.sub, device_id, device_name, &request)
            .await?;

        if session.is_expired() {
            self.delete_session_by_token(refresh_token).await;
            return Err(AppError::rejection(
                ErrorKind::RefreshExpired,
                "Refresh session expired",
            ));
        }

        // Bookkeeping only; the request proceeds even if this write is lost.
        if let Err(e) = self
            .sessions
            .touch(session.id, request.source_ip.as_deref())
            .await
        {
            debug!(session_id = %session.id, error = %e, "Failed to touch session");
        }

        let identity = claims.identity();
        self.check_role(&identity, request.require_admin)?;

        let (access_token, access_expires_at) = self.encoder.issue_access(&identity)?;
        let rotated = self.maybe_rotate(&session, &identity, refresh_token).await;

        Ok(AuthOutcome {
            identity,
            renewed: Some(RenewedCredentials {
                access_token,
                access_expires_at,
                refresh_token: rotated.as_ref().map(|(token, _)| token.clone()),
                refresh_expires_at: rotated.map(|(_, expires_at)| expires_at),
            }),
        })
    }

    /// Checks the device binding field by field, deleting the session on
    /// the first mismatch.
    async fn check_binding(
        &self,
        session: &RefreshSession,
        user_id: uuid::Uuid,
        device_id: &str,
        device_name: &str,
        request: &AuthRequest,
    ) -> AppResult<()> {
        let rejection = if session.user_id != user_id {
            Some((ErrorKind::SessionUserMismatch, "Session belongs to a different user"))
        } else if session.device.device_id != device_id {
            Some((ErrorKind::DeviceMismatch, "Device id does not match session binding"))
        } else if session.device.device_name != device_name {
            Some((
                ErrorKind::DeviceNameMismatch,
                "Device name does not match session binding",
            ))
        } else if self.enforce_ip_binding
            && let (Some(presented), Some(stored)) =
                (request.source_ip.as_deref(), session.device.last_ip.as_deref())
            && presented != stored
        {
            Some((ErrorKind::IpMismatch, "Source IP does not match session binding"))
        } else {
            None
        };

        if let Some((kind, message)) = rejection {
            self.delete_session_by_token(&session.token).await;
            return Err(AppError::rejection(kind, message));
        }
        Ok(())
    }

    /// Rotates the refresh credential when its remaining lifetime has
    /// dropped to the threshold. Returns the new token and expiry only
    /// when the conditional store write landed; any failure leaves the
    /// presented token in force.
    async fn maybe_rotate(
        &self,
        session: &RefreshSession,
        identity: &Identity,
        old_token: &str,
    ) -> Option<(String, chrono::DateTime<Utc>)> {
        if session.remaining() > self.rotation_threshold {
            return None;
        }

        let (new_token, expires_at) = match self.encoder.issue_refresh(identity, self.refresh_ttl_days)
        {
            Ok(minted) => minted,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Failed to mint rotated refresh credential");
                return None;
            }
        };

        match self
            .sessions
            .rotate_token(session.id, old_token, &new_token, expires_at)
            .await
        {
            Ok(true) => {
                debug!(session_id = %session.id, "Rotated refresh credential");
                Some((new_token, expires_at))
            }
            Ok(false) => {
                debug!(session_id = %session.id, "Rotation skipped, session superseded");
                None
            }
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Failed to persist rotated refresh credential");
                None
            }
        }
    }

    fn check_role(&self, identity: &Identity, require_admin: bool) -> AppResult<()> {
        if require_admin && !identity.role.is_admin() {
            return Err(AppError::rejection(
                ErrorKind::ForbiddenRole,
                "Admin role required",
            ));
        }
        Ok(())
    }

    /// Best-effort session removal; failures are logged, never surfaced.
    async fn delete_session_by_token(&self, token: &str) {
        if let Err(e) = self.sessions.delete_by_token(token).await {
            warn!(error = %e, "Failed to delete refresh session");
        }
    }

    /// Wraps an essential store read in a timeout; an elapsed read is a
    /// retryable infrastructure failure, never a rejection.
    async fn timed<T>(&self, fut: impl Future<Output = AppResult<T>>) -> AppResult<T> {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::store_unavailable("Session store read timed out")),
        }
    }
}
