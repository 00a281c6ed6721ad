//! File-backed storage backend.

use crate::{KeyValueStore, StorageError, StorageResult};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Mutex;

/// File-backed key-value store.
///
/// A single JSON object on disk, shared by every client process of the
/// same user. Reads go to disk on every call so that writes made by
/// another process are observed; writes are read-modify-write under a
/// process-local lock and land via rename so readers never see a
/// half-written file.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store backed by the given file. The file and its parent
    /// directory are created lazily on first write.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// The backing file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_map(&self) -> StorageResult<Map<String, Value>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::Encoding(format!(
                "{} is not a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(StorageError::Encoding(e.to_string())),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&Value::Object(map.clone()))
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut map = self.read_map()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let map = self.read_map()?;
        match map.get(key) {
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Ok(Some(other.to_string())),
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.write_lock.lock().unwrap();
        let mut map = self.read_map()?;
        let existed = map.remove(key).is_some();
        if existed {
            self.write_map(&map)?;
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_set_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("store.json"));

        assert_eq!(store.get("missing").unwrap(), None);

        store.set("accessToken", "tok1").unwrap();
        assert_eq!(store.get("accessToken").unwrap(), Some("tok1".to_string()));

        assert!(store.delete("accessToken").unwrap());
        assert!(!store.delete("accessToken").unwrap());
        assert_eq!(store.get("accessToken").unwrap(), None);
    }

    #[test]
    fn test_file_store_observes_external_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = FileStore::new(path.clone());

        // Another process writes the same file.
        let other = FileStore::new(path);
        other.set("accessToken", "from-elsewhere").unwrap();

        assert_eq!(
            store.get("accessToken").unwrap(),
            Some("from-elsewhere".to_string())
        );
    }

    #[test]
    fn test_file_store_rejects_non_object_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let store = FileStore::new(path);
        assert!(store.get("anything").is_err());
    }

    #[test]
    fn test_file_store_empty_file_is_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "").unwrap();

        let store = FileStore::new(path);
        assert_eq!(store.get("anything").unwrap(), None);
    }
}
