//! Durable key-value storage
//!
//! Local state (search history, onboarding flag) is kept as string values under
//! string keys. [`FileStore`] persists everything as one JSON document written
//! with the temp-file + rename pattern; [`MemoryStore`] backs tests and
//! ephemeral sessions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::constants::storage;
use crate::errors::{StorageError, StorageResult};

/// Async string key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value for `key`, `None` when absent
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value for `key`
    async fn set(&self, key: &str, value: String) -> StorageResult<()>;

    /// Remove `key`; removing an absent key is not an error
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Volatile store held in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StorageResult<()> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store in the platform data directory
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if no data directory exists
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_dir().ok_or_else(|| StorageError::Unavailable {
            reason: "no platform data directory".to_string(),
        })?;
        Ok(Self::new(
            base.join(storage::APP_DIR_NAME)
                .join(storage::STORE_FILE_NAME),
        ))
    }

    /// Store at `path` when given, otherwise in the platform data directory
    pub fn at_or_default(path: Option<&Path>) -> StorageResult<Self> {
        match path {
            Some(path) => Ok(Self::new(path)),
            None => Self::default_location(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document; a missing or unreadable document is empty
    async fn load(&self) -> StorageResult<HashMap<String, String>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(values) => Ok(values),
            Err(e) => {
                warn!(
                    "Ignoring corrupt store at {}: {}",
                    self.path.display(),
                    e
                );
                Ok(HashMap::new())
            }
        }
    }

    async fn save(&self, values: &HashMap<String, String>) -> StorageResult<()> {
        let content = serde_json::to_vec_pretty(values)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(storage::TEMP_FILE_SUFFIX);
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            error!("Failed to replace {}: {}", self.path.display(), e);
            e
        })?;

        debug!("Saved {} keys to {}", values.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut values = self.load().await?;
        values.insert(key.to_string(), value);
        self.save(&values).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut values = self.load().await?;
        if values.remove(key).is_some() {
            self.save(&values).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store_basic_operations() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("store.json");

        let store = FileStore::new(&path);
        store.set("a", "1".to_string()).await.unwrap();
        store.set("b", "2".to_string()).await.unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(reopened.get("b").await.unwrap().as_deref(), Some("2"));

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(storage::TEMP_FILE_SUFFIX);
        assert!(!PathBuf::from(temp_name).exists());
    }

    #[tokio::test]
    async fn test_file_store_corrupt_document_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", "1".to_string()).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_store_location_selection() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.json");

        let store = FileStore::at_or_default(Some(&path)).unwrap();
        assert_eq!(store.path(), path.as_path());

        match FileStore::at_or_default(None) {
            Ok(store) => assert!(store
                .path()
                .ends_with(Path::new(storage::APP_DIR_NAME).join(storage::STORE_FILE_NAME))),
            Err(e) => assert!(matches!(e, StorageError::Unavailable { .. })),
        }
    }

    #[tokio::test]
    async fn test_file_store_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("store.json"));

        store.remove("missing").await.unwrap();
        store.set("a", "1".to_string()).await.unwrap();
        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }
}
