//! Parcel backend REST client for authentication endpoints.
//!
//! Wraps the `/auth/*` routes: credential login, registration, session
//! verification (`/auth/me`) and logout. Every response arrives inside
//! the backend's standard envelope (`success`, `message`, `data`), so
//! failures are reported both via HTTP status and via `success: false`.

use crate::error::{AuthError, AuthResult};
use client_storage::{UserProfile, UserRole};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Standard backend response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Envelope for endpoints that return no payload.
#[derive(Debug, Deserialize)]
pub struct StatusEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Payload of a successful login or registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: UserProfile,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Fields for the registration endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub role: UserRole,
    pub address: String,
}

/// HTTP client for the parcel backend's auth endpoints.
#[derive(Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: Url) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url,
        }
    }

    /// Build the URL for an auth route.
    fn auth_url(&self, route: &str) -> AuthResult<Url> {
        Ok(self.base_url.join(&format!("auth/{}", route))?)
    }

    /// Exchange credentials for tokens and a profile.
    ///
    /// A 400/401/403 here means bad credentials, not a broken session;
    /// it is surfaced as `InvalidCredentials` so callers never treat it
    /// as a hard invalidation of existing state.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<LoginData> {
        let url = self.auth_url("login")?;
        debug!(%url, "Logging in");

        let response = self
            .http_client
            .post(url)
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let status = response.status();
        if matches!(status.as_u16(), 400 | 401 | 403) {
            let message = Self::envelope_message(response).await;
            return Err(AuthError::InvalidCredentials(message));
        }
        if !status.is_success() {
            let message = Self::envelope_message(response).await;
            return Err(AuthError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<LoginData> = response.json().await?;
        Self::unwrap_envelope(envelope, status.as_u16())
    }

    /// Create an account. Stateless: the caller logs in afterwards.
    pub async fn register(&self, request: &RegisterRequest) -> AuthResult<()> {
        let url = self.auth_url("register")?;
        debug!(%url, email = %request.email, "Registering account");

        let response = self.http_client.post(url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = Self::envelope_message(response).await;
            return Err(AuthError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: StatusEnvelope = response.json().await?;
        if !envelope.success {
            return Err(AuthError::Status {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "registration rejected".to_string()),
            });
        }
        Ok(())
    }

    /// Verify an access token against `/auth/me`.
    ///
    /// Status errors are returned as-is so callers can distinguish
    /// auth rejection (401/403) from transient failures (5xx).
    pub async fn me(&self, access_token: &str) -> AuthResult<UserProfile> {
        let url = self.auth_url("me")?;
        debug!(%url, "Verifying session");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = Self::envelope_message(response).await;
            return Err(AuthError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<UserProfile> = response.json().await?;
        Self::unwrap_envelope(envelope, status.as_u16())
    }

    /// Tell the backend to revoke the session.
    ///
    /// Best-effort: the caller clears local state whether or not the
    /// server heard us, so failures are logged and swallowed.
    pub async fn logout(&self, access_token: &str) {
        let url = match self.auth_url("logout") {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping server-side logout, bad URL: {}", e);
                return;
            }
        };

        match self
            .http_client
            .post(url)
            .bearer_auth(access_token)
            .send()
            .await
        {
            Ok(response) if !response.status().is_success() => {
                warn!(status = %response.status(), "Server-side logout failed");
            }
            Ok(_) => debug!("Server-side logout acknowledged"),
            Err(e) => warn!("Server-side logout request failed: {}", e),
        }
    }

    fn unwrap_envelope<T>(envelope: Envelope<T>, status: u16) -> AuthResult<T> {
        if !envelope.success {
            return Err(AuthError::Status {
                status,
                message: envelope
                    .message
                    .unwrap_or_else(|| "request rejected".to_string()),
            });
        }
        envelope.data.ok_or(AuthError::Status {
            status,
            message: "response envelope missing data".to_string(),
        })
    }

    /// Pull a human-readable message out of an error response body.
    async fn envelope_message(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<StatusEnvelope>().await {
            Ok(envelope) => envelope
                .message
                .unwrap_or_else(|| format!("HTTP {}", status)),
            Err(_) => format!("HTTP {}", status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_url_joins_routes() {
        let client = ApiClient::new(Url::parse("https://api.parceltrack.dev/").unwrap());
        assert_eq!(
            client.auth_url("me").unwrap().as_str(),
            "https://api.parceltrack.dev/auth/me"
        );
        assert_eq!(
            client.auth_url("login").unwrap().as_str(),
            "https://api.parceltrack.dev/auth/login"
        );
    }

    #[test]
    fn test_login_data_deserializes_camel_case() {
        let json = r#"{
            "user": {"id": "u1", "name": "Ada", "email": "a@b.com", "role": "sender"},
            "accessToken": "at-1",
            "refreshToken": "rt-1"
        }"#;
        let data: LoginData = serde_json::from_str(json).unwrap();
        assert_eq!(data.user.id, "u1");
        assert_eq!(data.access_token, "at-1");
        assert_eq!(data.refresh_token.as_deref(), Some("rt-1"));
    }

    #[test]
    fn test_login_data_refresh_token_optional() {
        let json = r#"{
            "user": {"id": "u1", "name": "Ada", "email": "a@b.com", "role": "admin"},
            "accessToken": "at-1"
        }"#;
        let data: LoginData = serde_json::from_str(json).unwrap();
        assert!(data.refresh_token.is_none());
    }

    #[test]
    fn test_envelope_with_data() {
        let json = r#"{"success": true, "message": "ok", "data": {"id": "u1", "name": "A", "email": "a@b.com", "role": "receiver"}}"#;
        let envelope: Envelope<UserProfile> = serde_json::from_str(json).unwrap();
        assert!(envelope.success);
        let profile = ApiClient::unwrap_envelope(envelope, 200).unwrap();
        assert_eq!(profile.role, UserRole::Receiver);
    }

    #[test]
    fn test_unsuccessful_envelope_becomes_status_error() {
        let json = r#"{"success": false, "message": "nope", "data": null}"#;
        let envelope: Envelope<UserProfile> = serde_json::from_str(json).unwrap();
        let err = ApiClient::unwrap_envelope(envelope, 200).unwrap_err();
        assert!(matches!(err, AuthError::Status { status: 200, .. }));
    }

    #[test]
    fn test_envelope_missing_data_is_an_error() {
        let json = r#"{"success": true, "message": "ok"}"#;
        let envelope: Envelope<UserProfile> = serde_json::from_str(json).unwrap();
        assert!(ApiClient::unwrap_envelope(envelope, 200).is_err());
    }

    #[test]
    fn test_register_request_serializes_role_lowercase() {
        let request = RegisterRequest {
            name: "Ada".to_string(),
            email: "a@b.com".to_string(),
            password: "pw".to_string(),
            phone: "555".to_string(),
            role: UserRole::Sender,
            address: "1 Main St".to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""role":"sender""#));
    }
}
