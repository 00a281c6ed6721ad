//! High-level API for credentials and the cached profile.

use crate::{KeyValueStore, StorageKeys, UserProfile};
use std::sync::Arc;

/// Owner of access/refresh tokens and the cached user profile.
///
/// All operations target the persistent namespace shared across client
/// processes. A storage error is equivalent to "no token": reads return
/// `None`, writes become no-ops, and nothing propagates past this
/// boundary.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    /// Create a new token store over the given storage backend.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Retrieve the access token.
    pub fn access_token(&self) -> Option<String> {
        self.read(StorageKeys::ACCESS_TOKEN)
    }

    /// Retrieve the refresh token.
    pub fn refresh_token(&self) -> Option<String> {
        self.read(StorageKeys::REFRESH_TOKEN)
    }

    /// Store both tokens. A missing refresh token removes any stale one.
    pub fn set_tokens(&self, access: &str, refresh: Option<&str>) {
        self.write(StorageKeys::ACCESS_TOKEN, access);
        match refresh {
            Some(refresh) => self.write(StorageKeys::REFRESH_TOKEN, refresh),
            None => self.remove(StorageKeys::REFRESH_TOKEN),
        }
    }

    /// Remove both tokens.
    pub fn clear_tokens(&self) {
        self.remove(StorageKeys::ACCESS_TOKEN);
        self.remove(StorageKeys::REFRESH_TOKEN);
    }

    /// Presence check only. No signature or expiry validation happens
    /// client-side; the server is authoritative.
    pub fn has_valid_tokens(&self) -> bool {
        self.access_token().is_some()
    }

    /// Retrieve the cached user profile.
    ///
    /// A malformed entry is deleted and treated as a cache miss.
    pub fn cached_profile(&self) -> Option<UserProfile> {
        let json = self.read(StorageKeys::USER_DATA)?;
        match serde_json::from_str(&json) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(error = %e, "Cached profile is malformed, discarding");
                self.remove(StorageKeys::USER_DATA);
                None
            }
        }
    }

    /// Store the cached user profile.
    pub fn set_cached_profile(&self, profile: &UserProfile) {
        match serde_json::to_string(profile) {
            Ok(json) => self.write(StorageKeys::USER_DATA, &json),
            Err(e) => tracing::warn!(error = %e, "Failed to encode profile for caching"),
        }
    }

    /// Remove the cached user profile.
    pub fn clear_cached_profile(&self) {
        self.remove(StorageKeys::USER_DATA);
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(key, error = %e, "Storage read failed, treating as absent");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value) {
            tracing::warn!(key, error = %e, "Storage write failed, value not persisted");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.storage.delete(key) {
            tracing::debug!(key, error = %e, "Storage delete failed");
        }
    }
}
