//! In-memory storage backend.

use crate::{KeyValueStore, StorageResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory key-value store.
///
/// Backs `SessionFlagStore` (per-process, discarded on exit) and stands
/// in for the persistent namespace in tests.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.lock().unwrap();
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let data = self.data.lock().unwrap();
        Ok(data.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.lock().unwrap();
        Ok(data.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();

        store.set("test_key", "test_value").unwrap();
        assert_eq!(
            store.get("test_key").unwrap(),
            Some("test_value".to_string())
        );

        assert!(store.has("test_key").unwrap());
        assert!(!store.has("nonexistent").unwrap());

        assert!(store.delete("test_key").unwrap());
        assert!(!store.delete("test_key").unwrap());
        assert_eq!(store.get("test_key").unwrap(), None);
    }
}
