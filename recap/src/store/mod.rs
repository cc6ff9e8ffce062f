//! # Durable summary storage
//!
//! [`SummaryStore`] is the durable layer under [`SummaryCache`](crate::cache::SummaryCache):
//! a flat `hash -> summary` map that survives process restarts.
//!
//! | Type            | Persistence        | Use case                         |
//! |-----------------|--------------------|----------------------------------|
//! | [`InMemoryStore`] | In-memory          | Tests, session-only caching      |
//! | [`SqliteStore`]   | SQLite file        | Default for the CLI host         |
//! | [`FileStore`]     | One JSON per hash  | Hosts that sync a plain directory |
//!
//! The host picks the backend; the cache only sees `Arc<dyn SummaryStore>`.

mod file;
mod in_memory;
mod sqlite;

pub use file::FileStore;
pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which durable backend the host opens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// [`InMemoryStore`]: nothing survives the process.
    Memory,
    /// [`SqliteStore`] at the cache path.
    #[default]
    Sqlite,
    /// [`FileStore`] in the cache path directory.
    File,
}

impl std::str::FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            "file" => Ok(Self::File),
            _ => Err(format!(
                "unknown cache backend: {} (use memory, sqlite, or file)",
                s
            )),
        }
    }
}

impl CacheBackend {
    /// Opens the backend. `path` is the database file (sqlite) or directory (file) and
    /// is ignored for memory.
    pub fn open(self, path: &Path) -> Result<Arc<dyn SummaryStore>, StoreError> {
        Ok(match self {
            Self::Memory => Arc::new(InMemoryStore::new()),
            Self::Sqlite => Arc::new(SqliteStore::new(path)?),
            Self::File => Arc::new(FileStore::new(path)?),
        })
    }
}

/// Errors from a durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend I/O or database failure.
    #[error("storage error: {0}")]
    Storage(String),
    /// A stored document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Key rejected by the backend (e.g. not usable as a file name).
    #[error("invalid key: {0:?}")]
    InvalidKey(String),
    /// `delete_all` removed some entries but not all of them.
    #[error("partial clear: removed {removed}, failed {failed}")]
    PartialClear { removed: usize, failed: usize },
}

/// Durable key/value persistence for block summaries.
///
/// Keys are block content hashes. `put` is an upsert with last-writer-wins semantics;
/// there is no versioning and no multi-key transaction.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Summary stored under `hash`, or `None` if absent.
    async fn get(&self, hash: &str) -> Result<Option<String>, StoreError>;

    /// Inserts or replaces the summary for `hash`.
    async fn put(&self, hash: &str, summary: &str) -> Result<(), StoreError>;

    /// Removes `hash`. Removing an absent key is not an error.
    async fn delete(&self, hash: &str) -> Result<(), StoreError>;

    /// All stored keys, in no particular order.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Removes every entry and returns how many were removed.
    ///
    /// The default enumerates [`keys`](Self::keys) and deletes one by one; if any delete
    /// fails the remaining keys are still attempted and the result is
    /// [`StoreError::PartialClear`].
    async fn delete_all(&self) -> Result<usize, StoreError> {
        let keys = self.keys().await?;
        let mut removed = 0;
        let mut failed = 0;
        for key in keys {
            match self.delete(&key).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(hash = %key, error = %e, "failed to delete summary entry");
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            return Err(StoreError::PartialClear { removed, failed });
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tokio::sync::Mutex;

    /// Store whose deletes fail for a fixed set of keys.
    struct StickyStore {
        keys: Mutex<HashSet<String>>,
        sticky: HashSet<String>,
    }

    #[async_trait]
    impl SummaryStore for StickyStore {
        async fn get(&self, _hash: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        async fn put(&self, hash: &str, _summary: &str) -> Result<(), StoreError> {
            self.keys.lock().await.insert(hash.to_string());
            Ok(())
        }

        async fn delete(&self, hash: &str) -> Result<(), StoreError> {
            if self.sticky.contains(hash) {
                return Err(StoreError::Storage("locked".into()));
            }
            self.keys.lock().await.remove(hash);
            Ok(())
        }

        async fn keys(&self) -> Result<Vec<String>, StoreError> {
            Ok(self.keys.lock().await.iter().cloned().collect())
        }
    }

    #[tokio::test]
    async fn default_delete_all_reports_partial_failure() {
        let store = StickyStore {
            keys: Mutex::new(HashSet::new()),
            sticky: ["b".to_string()].into_iter().collect(),
        };
        for k in ["a", "b", "c"] {
            store.put(k, "s").await.unwrap();
        }
        let err = store.delete_all().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::PartialClear {
                removed: 2,
                failed: 1
            }
        ));
        assert_eq!(store.keys().await.unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn cache_backend_from_str() {
        assert_eq!("SQLite".parse::<CacheBackend>().unwrap(), CacheBackend::Sqlite);
        assert_eq!("file".parse::<CacheBackend>().unwrap(), CacheBackend::File);
        assert_eq!("memory".parse::<CacheBackend>().unwrap(), CacheBackend::Memory);
        let err = "redis".parse::<CacheBackend>().unwrap_err();
        assert!(err.contains("unknown cache backend"));
    }

    #[tokio::test]
    async fn open_file_backend_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summaries");
        let store = CacheBackend::File.open(&path).unwrap();
        store.put("aa", "s").await.unwrap();
        assert!(path.join("aa.json").exists());
    }

    #[tokio::test]
    async fn default_delete_all_counts_removed() {
        let store = StickyStore {
            keys: Mutex::new(HashSet::new()),
            sticky: HashSet::new(),
        };
        store.put("a", "s").await.unwrap();
        store.put("b", "s").await.unwrap();
        assert_eq!(store.delete_all().await.unwrap(), 2);
        assert!(store.keys().await.unwrap().is_empty());
    }
}
