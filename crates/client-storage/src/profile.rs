//! User profile types cached alongside credentials.

use serde::{Deserialize, Serialize};

/// Role a user holds in the parcel-tracking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Sender,
    Receiver,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Sender => "sender",
            UserRole::Receiver => "receiver",
        }
    }
}

/// User profile as returned by the backend and cached locally.
///
/// A cached profile without a valid access token is display-only: it is
/// never trusted for authorization decisions until the server confirms
/// the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_string(&UserRole::Sender).unwrap(), "\"sender\"");
        let role: UserRole = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, UserRole::Admin);
    }

    #[test]
    fn test_profile_round_trip() {
        let profile = UserProfile {
            id: "1".to_string(),
            name: "Ada".to_string(),
            email: "a@b.com".to_string(),
            role: UserRole::Receiver,
        };

        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("\"receiver\""));

        let back: UserProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }
}
