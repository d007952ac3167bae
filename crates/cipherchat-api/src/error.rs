//! Maps domain `AppError` to HTTP responses.
//!
//! Every gate rejection keeps its own machine-readable code so clients
//! can tell "re-login required" apart from "temporary failure, retry".

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use cipherchat_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Whether the client may retry the same request.
    pub retryable: bool,
}

/// Response wrapper around [`AppError`] for handler return types.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let Self(inner) = self;
        let status = match inner.kind {
            ErrorKind::MissingDeviceInfo | ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::MissingCredentials
            | ErrorKind::InvalidAccessCredential
            | ErrorKind::InvalidRefreshCredential
            | ErrorKind::RefreshRequired
            | ErrorKind::SessionNotFound
            | ErrorKind::SessionUserMismatch
            | ErrorKind::DeviceMismatch
            | ErrorKind::DeviceNameMismatch
            | ErrorKind::IpMismatch
            | ErrorKind::RefreshExpired => StatusCode::UNAUTHORIZED,
            ErrorKind::ForbiddenRole => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InvalidEnvelope => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal | ErrorKind::Configuration | ErrorKind::Serialization => {
                tracing::error!(error = %inner, "Internal server error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ApiErrorResponse {
            error: inner.kind.to_string(),
            message: inner.message,
            retryable: inner.kind.is_retryable(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_map_to_distinct_codes_under_401() {
        let kinds = [
            ErrorKind::InvalidAccessCredential,
            ErrorKind::RefreshRequired,
            ErrorKind::SessionNotFound,
            ErrorKind::DeviceMismatch,
            ErrorKind::RefreshExpired,
        ];
        let mut codes = std::collections::HashSet::new();
        for kind in kinds {
            let response = ApiError(AppError::rejection(kind, "nope")).into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            codes.insert(kind.to_string());
        }
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn store_unavailable_is_retryable_503() {
        let response = ApiError(AppError::store_unavailable("down")).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
