//! Unified application error types for CipherChat.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Gate rejections are first-class
//! error kinds so transport adapters can map each one to a distinct
//! client-visible signal.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
///
/// The `Missing*`/`Invalid*`/`*Mismatch`/`RefreshExpired`/`ForbiddenRole`
/// variants are the terminal rejection codes produced by the session
/// authentication gate. `StoreUnavailable` is the only retryable kind:
/// it signals transient infrastructure failure, never a definitive
/// rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Device id or device name was not supplied.
    MissingDeviceInfo,
    /// Neither an access nor a refresh credential was supplied.
    MissingCredentials,
    /// The access credential failed signature or payload validation.
    InvalidAccessCredential,
    /// The refresh credential failed signature or payload validation.
    InvalidRefreshCredential,
    /// The access credential expired and no refresh credential was supplied.
    RefreshRequired,
    /// No refresh session exists for the presented refresh token.
    SessionNotFound,
    /// The refresh session belongs to a different user.
    SessionUserMismatch,
    /// The presented device id does not match the session binding.
    DeviceMismatch,
    /// The presented device name does not match the session binding.
    DeviceNameMismatch,
    /// The source IP does not match the session binding.
    IpMismatch,
    /// The refresh session itself has expired.
    RefreshExpired,
    /// The authenticated identity lacks the required role.
    ForbiddenRole,
    /// A message envelope was missing its recipient or ciphertext.
    InvalidEnvelope,
    /// A durable store or the backplane is temporarily unreachable.
    StoreUnavailable,
    /// Input validation failed.
    Validation,
    /// The requested resource was not found.
    NotFound,
    /// A conflict occurred (duplicate entry, concurrent modification).
    Conflict,
    /// An internal server error occurred.
    Internal,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
}

impl ErrorKind {
    /// Whether this kind represents a transient condition the client may retry.
    ///
    /// Every gate rejection is terminal for the current request; only
    /// infrastructure failure is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }

    /// Whether this kind is one of the gate's terminal rejection codes.
    pub fn is_gate_rejection(&self) -> bool {
        matches!(
            self,
            Self::MissingDeviceInfo
                | Self::MissingCredentials
                | Self::InvalidAccessCredential
                | Self::InvalidRefreshCredential
                | Self::RefreshRequired
                | Self::SessionNotFound
                | Self::SessionUserMismatch
                | Self::DeviceMismatch
                | Self::DeviceNameMismatch
                | Self::IpMismatch
                | Self::RefreshExpired
                | Self::ForbiddenRole
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDeviceInfo => write!(f, "MISSING_DEVICE_INFO"),
            Self::MissingCredentials => write!(f, "MISSING_CREDENTIALS"),
            Self::InvalidAccessCredential => write!(f, "INVALID_ACCESS_CREDENTIAL"),
            Self::InvalidRefreshCredential => write!(f, "INVALID_REFRESH_CREDENTIAL"),
            Self::RefreshRequired => write!(f, "REFRESH_REQUIRED"),
            Self::SessionNotFound => write!(f, "SESSION_NOT_FOUND"),
            Self::SessionUserMismatch => write!(f, "SESSION_USER_MISMATCH"),
            Self::DeviceMismatch => write!(f, "DEVICE_MISMATCH"),
            Self::DeviceNameMismatch => write!(f, "DEVICE_NAME_MISMATCH"),
            Self::IpMismatch => write!(f, "IP_MISMATCH"),
            Self::RefreshExpired => write!(f, "REFRESH_EXPIRED"),
            Self::ForbiddenRole => write!(f, "FORBIDDEN_ROLE"),
            Self::InvalidEnvelope => write!(f, "INVALID_ENVELOPE"),
            Self::StoreUnavailable => write!(f, "STORE_UNAVAILABLE"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
        }
    }
}

/// The unified application error used throughout CipherChat.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a store-unavailable error (retryable).
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StoreUnavailable, message)
    }

    /// Create an invalid-envelope error.
    pub fn invalid_envelope(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidEnvelope, message)
    }

    /// Create a gate rejection with the given kind.
    pub fn rejection(kind: ErrorKind, message: impl Into<String>) -> Self {
        debug_assert!(kind.is_gate_rejection());
        Self::new(kind, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_rejections_are_terminal() {
        assert!(ErrorKind::DeviceMismatch.is_gate_rejection());
        assert!(!ErrorKind::DeviceMismatch.is_retryable());
        assert!(ErrorKind::StoreUnavailable.is_retryable());
        assert!(!ErrorKind::StoreUnavailable.is_gate_rejection());
    }

    #[test]
    fn display_codes_are_distinct() {
        let kinds = [
            ErrorKind::SessionNotFound,
            ErrorKind::SessionUserMismatch,
            ErrorKind::DeviceMismatch,
            ErrorKind::DeviceNameMismatch,
            ErrorKind::IpMismatch,
            ErrorKind::RefreshExpired,
        ];
        let codes: std::collections::HashSet<String> =
            kinds.iter().map(|k| k.to_string()).collect();
        assert_eq!(codes.len(), kinds.len());
    }
}
