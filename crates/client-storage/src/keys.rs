//! Storage key constants.

/// Keys used in the persistent and per-process namespaces.
pub struct StorageKeys;

impl StorageKeys {
    /// Access token (raw string)
    pub const ACCESS_TOKEN: &'static str = "accessToken";

    /// Refresh token (raw string)
    pub const REFRESH_TOKEN: &'static str = "refreshToken";

    /// Cached user profile (JSON)
    pub const USER_DATA: &'static str = "userData";

    /// Per-process flag: the coordinator ran its bootstrap once
    pub const AUTH_STATE_INITIALIZED: &'static str = "authStateInitialized";

    /// Per-process flag: a session was active in this process
    pub const SESSION_ACTIVE: &'static str = "sessionActive";

    /// Sentinel value stored for boolean flags
    pub const FLAG_TRUE: &'static str = "true";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_unique() {
        let keys = [
            StorageKeys::ACCESS_TOKEN,
            StorageKeys::REFRESH_TOKEN,
            StorageKeys::USER_DATA,
            StorageKeys::AUTH_STATE_INITIALIZED,
            StorageKeys::SESSION_ACTIVE,
        ];
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len(), "Storage keys must be unique");
    }
}
