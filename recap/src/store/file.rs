//! Directory-backed SummaryStore: one JSON document per hash.
//!
//! Layout: `<dir>/<hash>.json` containing `{"hash": ..., "summary": ...}`. Writes go to a
//! temporary sibling and are renamed into place, so a reader never sees a half-written
//! document. Every write gets its own temporary name; concurrent writes to one hash
//! end with one complete document in place.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{StoreError, SummaryStore};

const EXTENSION: &str = "json";

#[derive(Serialize, Deserialize)]
struct Entry {
    hash: String,
    summary: String,
}

fn storage_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Storage(e.to_string())
}

/// Keys become file names; only `[A-Za-z0-9_-]` is accepted.
fn validate_key(hash: &str) -> Result<(), StoreError> {
    let ok = !hash.is_empty()
        && hash
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(hash.to_string()))
    }
}

/// File-system store rooted at a directory.
///
/// **Interaction**: Used as `Arc<dyn SummaryStore>` under
/// [`SummaryCache`](crate::cache::SummaryCache). `delete_all` uses the trait default, so a
/// file that cannot be removed surfaces as [`StoreError::PartialClear`].
pub struct FileStore {
    dir: PathBuf,
    write_seq: AtomicU64,
}

impl FileStore {
    /// Creates the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(storage_err)?;
        Ok(Self {
            dir,
            write_seq: AtomicU64::new(0),
        })
    }

    fn entry_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", hash, EXTENSION))
    }

    /// `.<hash>.<pid>.<seq>.tmp`: unique per write, ignored by `keys`.
    fn temp_path(&self, hash: &str) -> PathBuf {
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(".{}.{}.{}.tmp", hash, std::process::id(), seq))
    }
}

#[async_trait]
impl SummaryStore for FileStore {
    async fn get(&self, hash: &str) -> Result<Option<String>, StoreError> {
        validate_key(hash)?;
        let bytes = match tokio::fs::read(self.entry_path(hash)).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_err(e)),
        };
        let entry: Entry = serde_json::from_slice(&bytes)?;
        if entry.hash != hash {
            return Err(StoreError::Storage(format!(
                "entry file for {} records hash {}",
                hash, entry.hash
            )));
        }
        Ok(Some(entry.summary))
    }

    async fn put(&self, hash: &str, summary: &str) -> Result<(), StoreError> {
        validate_key(hash)?;
        let body = serde_json::to_vec(&Entry {
            hash: hash.to_string(),
            summary: summary.to_string(),
        })?;
        let tmp = self.temp_path(hash);
        tokio::fs::write(&tmp, body).await.map_err(storage_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, self.entry_path(hash)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(storage_err(e));
        }
        Ok(())
    }

    async fn delete(&self, hash: &str) -> Result<(), StoreError> {
        validate_key(hash)?;
        match tokio::fs::remove_file(self.entry_path(hash)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err(e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut dir = tokio::fs::read_dir(&self.dir).await.map_err(storage_err)?;
        let mut keys = Vec::new();
        while let Some(item) = dir.next_entry().await.map_err(storage_err)? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_key(stem).is_ok() {
                    keys.push(stem.to_string());
                }
            }
        }
        Ok(keys)
    }
}
