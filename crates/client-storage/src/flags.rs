//! Process-lifetime session flags.

use crate::{KeyValueStore, MemoryStore, StorageKeys};

/// Transient flags scoped to one process.
///
/// The backing store lives in memory only, so the flags disappear when
/// the process exits, the analog of per-context transient storage.
/// They gate first-load cache-clearing heuristics in the coordinator
/// and carry no authorization meaning.
#[derive(Default)]
pub struct SessionFlagStore {
    storage: MemoryStore,
}

impl SessionFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the coordinator already ran its bootstrap in this process.
    pub fn is_initialized(&self) -> bool {
        self.flag(StorageKeys::AUTH_STATE_INITIALIZED)
    }

    /// Record that bootstrap ran.
    pub fn mark_initialized(&self) {
        self.set_flag(StorageKeys::AUTH_STATE_INITIALIZED, true);
    }

    /// Whether a session was active in this process.
    ///
    /// Bookkeeping only. A browser's per-tab storage survives reloads,
    /// which is what makes this flag useful for telling a reload from a
    /// first load; this store dies with the process, so every start is
    /// a first load and the coordinator never branches on it. It is
    /// kept for hosts that want to show "you were signed in here".
    pub fn is_session_active(&self) -> bool {
        self.flag(StorageKeys::SESSION_ACTIVE)
    }

    /// Record session activity (set on login/restore, cleared on logout).
    pub fn set_session_active(&self, active: bool) {
        self.set_flag(StorageKeys::SESSION_ACTIVE, active);
    }

    fn flag(&self, key: &str) -> bool {
        matches!(self.storage.get(key), Ok(Some(v)) if v == StorageKeys::FLAG_TRUE)
    }

    fn set_flag(&self, key: &str, value: bool) {
        let result = if value {
            self.storage.set(key, StorageKeys::FLAG_TRUE)
        } else {
            self.storage.delete(key).map(|_| ())
        };
        if let Err(e) = result {
            tracing::debug!(key, error = %e, "Session flag update failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_start_unset() {
        let flags = SessionFlagStore::new();
        assert!(!flags.is_initialized());
        assert!(!flags.is_session_active());
    }

    #[test]
    fn test_initialized_flag_sticks() {
        let flags = SessionFlagStore::new();
        flags.mark_initialized();
        assert!(flags.is_initialized());
    }

    #[test]
    fn test_session_active_toggles() {
        let flags = SessionFlagStore::new();
        flags.set_session_active(true);
        assert!(flags.is_session_active());
        flags.set_session_active(false);
        assert!(!flags.is_session_active());
    }
}
