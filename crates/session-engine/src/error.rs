//! Authentication error types.

use client_storage::StorageError;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Invalid email or password
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Backend returned a non-success status
    #[error("Server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Session not found
    #[error("Not logged in")]
    NotLoggedIn,

    /// A stale response arrived after a newer logout/invalidation
    #[error("Superseded by a newer logout")]
    Superseded,

    /// Invalid transition in the auth state machine
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Returns true when the server rejected the credentials themselves
    /// (401/403). Fatal to the session: the same token must never be
    /// retried.
    pub fn is_auth_rejected(&self) -> bool {
        match self {
            AuthError::Status { status, .. } => matches!(status, 401 | 403),
            AuthError::Http(e) => e
                .status()
                .map(|s| matches!(s.as_u16(), 401 | 403))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Returns true if this error is transient and the operation can be
    /// retried later without changing anything.
    ///
    /// Transient errors include network unavailability, timeouts, and
    /// 5xx server responses.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Timeout => true,
            AuthError::Status { status, .. } => (500..600).contains(status),
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            _ => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
