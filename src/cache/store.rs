//! Key/value store backends for the cache layer
//!
//! The cache persists through the `KeyValueStore` trait so the same policy
//! code runs against an on-disk store in the app and an in-memory store in
//! tests. All operations are asynchronous and fallible; the cache manager
//! is responsible for degrading gracefully when they fail.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use directories::ProjectDirs;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

/// Errors that can occur in a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O operation failed
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Key contains characters the backend cannot represent
    #[error("invalid store key: {0}")]
    InvalidKey(String),
}

/// Asynchronous string key/value store
///
/// The store is shared across the whole process and may hold entries that
/// do not belong to the cache; callers that enumerate keys must filter to
/// their own namespace.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value for `key`, or `None` if the key is absent
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes `value` under `key`, replacing any existing value
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`; removing an absent key is not an error
    async fn remove_item(&self, key: &str) -> Result<(), StoreError>;

    /// Returns every key currently in the store
    async fn get_all_keys(&self) -> Result<Vec<String>, StoreError>;

    /// Removes all of `keys` in one batch
    async fn multi_remove(&self, keys: &[String]) -> Result<(), StoreError>;
}

/// In-memory store backed by a `HashMap`
///
/// Used as the backing store in unit tests and for embedders that do not
/// want persistence across process restarts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn get_all_keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }

    async fn multi_remove(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

/// File-backed store keeping one JSON file per key
///
/// Files live in an XDG-compliant cache directory (`~/.cache/bestshelf/`
/// on Linux) by default. Keys map directly to file names, so keys with
/// path separators are rejected rather than escaping the store directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    store_dir: PathBuf,
}

impl FileStore {
    /// Creates a store in the platform cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g. no
    /// home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "bestshelf")?;
        Some(Self {
            store_dir: project_dirs.cache_dir().to_path_buf(),
        })
    }

    /// Creates a store rooted at a custom directory
    ///
    /// Useful for testing or when a specific location is needed.
    pub fn with_dir(store_dir: PathBuf) -> Self {
        Self { store_dir }
    }

    /// Returns the path of the file holding `key`
    fn entry_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.store_dir.join(format!("{key}.json")))
    }

    /// Ensures the store directory exists
    async fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.store_dir).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.entry_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.entry_path(key)?;
        self.ensure_dir().await?;
        fs::write(&path, value).await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_all_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut read_dir = match fs::read_dir(&self.store_dir).await {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(key) = name.strip_suffix(".json") {
                keys.push(key.to_string());
            }
        }
        Ok(keys)
    }

    async fn multi_remove(&self, keys: &[String]) -> Result<(), StoreError> {
        for key in keys {
            self.remove_item(key).await?;
        }
        Ok(())
    }
}
