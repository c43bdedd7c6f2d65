//! Client-side key-value storage.
//!
//! Two scopes with different lifetimes:
//!
//! - [`StorageScope::Tab`] lives for one browsing context (one process). The
//!   access token goes here.
//! - [`StorageScope::Durable`] survives restarts. It is backed by a JSON file
//!   and holds the refresh token and the selected branch.
//!
//! Stores are cheaply cloneable handles; clones share the same entries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Errors from the durable store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be (de)serialized.
    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Lifetime of a [`KeyValueStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageScope {
    /// Cleared when the process exits.
    Tab,
    /// Persisted to disk.
    Durable,
}

/// A string key-value store with an explicit lifetime scope.
#[derive(Clone)]
pub struct KeyValueStore {
    inner: Arc<KeyValueStoreInner>,
}

struct KeyValueStoreInner {
    scope: StorageScope,
    path: Option<PathBuf>,
    entries: RwLock<BTreeMap<String, String>>,
    /// Held from mutation through rename so the file matches the last write.
    flush: Mutex<()>,
}

impl std::fmt::Debug for KeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueStore")
            .field("scope", &self.inner.scope)
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

impl KeyValueStore {
    /// Create an empty tab-scoped store.
    #[must_use]
    pub fn tab() -> Self {
        Self {
            inner: Arc::new(KeyValueStoreInner {
                scope: StorageScope::Tab,
                path: None,
                entries: RwLock::new(BTreeMap::new()),
                flush: Mutex::new(()),
            }),
        }
    }

    /// Open (or create) a durable store backed by `path`.
    ///
    /// A missing file yields an empty store. A corrupt file is logged and
    /// treated as empty so a damaged state file never blocks startup.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file exists but cannot be read.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Discarding unreadable durable store");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        debug!(path = %path.display(), keys = entries.len(), "Opened durable store");

        Ok(Self {
            inner: Arc::new(KeyValueStoreInner {
                scope: StorageScope::Durable,
                path: Some(path),
                entries: RwLock::new(entries),
                flush: Mutex::new(()),
            }),
        })
    }

    /// The lifetime scope of this store.
    #[must_use]
    pub fn scope(&self) -> StorageScope {
        self.inner.scope
    }

    /// Read a raw value.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.inner.entries.read().await.get(key).cloned()
    }

    /// Write a raw value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if a durable store cannot be flushed.
    pub async fn set(&self, key: &str, value: impl Into<String>) -> Result<(), StorageError> {
        let _flush = self.inner.flush.lock().await;
        let snapshot = {
            let mut entries = self.inner.entries.write().await;
            entries.insert(key.to_string(), value.into());
            entries.clone()
        };
        self.flush(&snapshot).await
    }

    /// Remove a value. Returns whether the key was present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if a durable store cannot be flushed.
    pub async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let _flush = self.inner.flush.lock().await;
        let (removed, snapshot) = {
            let mut entries = self.inner.entries.write().await;
            let removed = entries.remove(key).is_some();
            (removed, entries.clone())
        };
        if removed {
            self.flush(&snapshot).await?;
        }
        Ok(removed)
    }

    /// Read and deserialize a JSON value.
    ///
    /// Values that fail to parse are logged and reported as absent.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Ignoring unparseable stored value");
                None
            }
        }
    }

    /// Serialize and write a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or flushing fails.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw).await
    }

    /// Persist the full map for durable stores (write to temp file, then rename).
    async fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let Some(path) = self.inner.path.as_deref() else {
            return Ok(());
        };

        let contents = serde_json::to_string_pretty(entries)?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| io_error(dir, source))?;
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|source| io_error(&tmp, source))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|source| io_error(path, source))?;
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tab_store_is_in_memory() {
        let store = KeyValueStore::tab();
        assert_eq!(store.scope(), StorageScope::Tab);
        store.set("accessToken", "abc").await.unwrap();
        assert_eq!(store.get("accessToken").await.as_deref(), Some("abc"));
        assert!(store.remove("accessToken").await.unwrap());
        assert!(!store.remove("accessToken").await.unwrap());
        assert_eq!(store.get("accessToken").await, None);
    }

    #[tokio::test]
    async fn test_durable_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let store = KeyValueStore::open(&path).await.unwrap();
        store.set("refreshToken", "r-1").await.unwrap();
        store.set_json("selectedBranch", &vec![1, 2]).await.unwrap();
        drop(store);

        let reopened = KeyValueStore::open(&path).await.unwrap();
        assert_eq!(reopened.scope(), StorageScope::Durable);
        assert_eq!(reopened.get("refreshToken").await.as_deref(), Some("r-1"));
        assert_eq!(
            reopened.get_json::<Vec<i32>>("selectedBranch").await,
            Some(vec![1, 2])
        );
    }

    #[tokio::test]
    async fn test_corrupt_durable_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = KeyValueStore::open(&path).await.unwrap();
        assert_eq!(store.get("refreshToken").await, None);
    }

    #[tokio::test]
    async fn test_get_json_ignores_bad_value() {
        let store = KeyValueStore::tab();
        store.set("selectedBranch", "{oops").await.unwrap();
        assert_eq!(store.get_json::<Vec<i32>>("selectedBranch").await, None);
    }

    #[tokio::test]
    async fn test_overlapping_durable_writes_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let store = KeyValueStore::open(&path).await.unwrap();

        for round in 0..50 {
            store.set("refreshToken", format!("r-{round}")).await.unwrap();
            let (removed, selected) = tokio::join!(
                store.remove("refreshToken"),
                store.set("selectedBranch", format!("{{\"id\":{round}}}")),
            );
            assert!(removed.unwrap());
            selected.unwrap();
        }

        let reopened = KeyValueStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("refreshToken").await, None);
        assert_eq!(
            reopened.get("selectedBranch").await.as_deref(),
            Some("{\"id\":49}")
        );
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = KeyValueStore::tab();
        let clone = store.clone();
        clone.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.as_deref(), Some("v"));
    }
}
