//! Local Storage
//!
//! String key/value persistence standing in for the browser's
//! `localStorage`. Only two keys are ever written: the admin token and the
//! device identifier.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

/// Key holding the admin bearer token
pub const ADMIN_TOKEN_KEY: &str = "adminToken";

/// Key holding the per-install device identifier
pub const DEVICE_ID_KEY: &str = "deviceId";

/// File name used by [`FileStorage`] inside the data directory
pub const STORAGE_FILE_NAME: &str = "local_storage.json";

/// Errors that can occur while reading or writing local storage
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a JSON string map
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Browser-style key/value storage
pub trait LocalStorage: Send + Sync {
    /// Read a value, `None` when the key was never set or was removed
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a key; removing a missing key is not an error
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

/// In-process storage, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let items = self
            .items
            .read()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut items = self
            .items
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let mut items = self
            .items
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        items.remove(key);
        Ok(())
    }
}

/// Storage backed by a single JSON object on disk
///
/// The whole map is re-read on every access, so a process sees keys written
/// by earlier runs. Writes go through a uniquely named temp file and a
/// rename, so a reader never sees a half-written file. Locking is only
/// in-process: two processes writing different keys at the same moment are
/// last-writer-wins and one update can be lost.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    guard: RwLock<()>,
}

impl FileStorage {
    /// Open storage in `data_dir`, creating the directory if needed
    pub fn open(data_dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = data_dir.as_ref();
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(STORAGE_FILE_NAME),
            guard: RwLock::new(()),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, items: &BTreeMap<String, String>) -> StorageResult<()> {
        let tmp = self
            .path
            .with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        std::fs::write(&tmp, serde_json::to_vec_pretty(items)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self
            .guard
            .read()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self
            .guard
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        let mut items = self.load()?;
        items.insert(key.to_string(), value.to_string());
        self.save(&items)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let _guard = self
            .guard
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        let mut items = self.load()?;
        if items.remove(key).is_some() {
            self.save(&items)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item(ADMIN_TOKEN_KEY).unwrap(), None);

        storage.set_item(ADMIN_TOKEN_KEY, "abc").unwrap();
        assert_eq!(storage.get_item(ADMIN_TOKEN_KEY).unwrap().as_deref(), Some("abc"));

        storage.remove_item(ADMIN_TOKEN_KEY).unwrap();
        assert_eq!(storage.get_item(ADMIN_TOKEN_KEY).unwrap(), None);

        // Removing twice is fine
        storage.remove_item(ADMIN_TOKEN_KEY).unwrap();
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempdir().unwrap();

        {
            let storage = FileStorage::open(dir.path()).unwrap();
            storage.set_item(DEVICE_ID_KEY, "device-1").unwrap();
            storage.set_item(ADMIN_TOKEN_KEY, "token-1").unwrap();
        }

        let storage = FileStorage::open(dir.path()).unwrap();
        assert_eq!(storage.get_item(DEVICE_ID_KEY).unwrap().as_deref(), Some("device-1"));
        assert_eq!(storage.get_item(ADMIN_TOKEN_KEY).unwrap().as_deref(), Some("token-1"));

        storage.remove_item(ADMIN_TOKEN_KEY).unwrap();
        let reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.get_item(ADMIN_TOKEN_KEY).unwrap(), None);
        assert_eq!(reopened.get_item(DEVICE_ID_KEY).unwrap().as_deref(), Some("device-1"));
    }

    #[test]
    fn test_file_storage_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("nested")).unwrap();
        assert_eq!(storage.get_item(DEVICE_ID_KEY).unwrap(), None);
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_file_storage_instances_write_concurrently() {
        let dir = tempdir().unwrap();
        let first = FileStorage::open(dir.path()).unwrap();
        let second = FileStorage::open(dir.path()).unwrap();

        std::thread::scope(|scope| {
            for (storage, key) in [(&first, ADMIN_TOKEN_KEY), (&second, DEVICE_ID_KEY)] {
                scope.spawn(move || {
                    for i in 0..50 {
                        storage.set_item(key, &i.to_string()).unwrap();
                    }
                });
            }
        });

        // Whatever won, the file is whole and no temp files are left behind
        let reopened = FileStorage::open(dir.path()).unwrap();
        assert!(reopened.get_item(ADMIN_TOKEN_KEY).is_ok());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name != STORAGE_FILE_NAME)
            .collect();
        assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");
    }

    #[test]
    fn test_file_storage_corrupt_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(STORAGE_FILE_NAME), "not json").unwrap();

        let storage = FileStorage::open(dir.path()).unwrap();
        let err = storage.get_item(DEVICE_ID_KEY).unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
