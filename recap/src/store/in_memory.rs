//! In-memory SummaryStore. Not persistent.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, SummaryStore};

/// In-memory store. Entries live as long as the value (or its clones; clones share data).
///
/// **Interaction**: Used as `Arc<dyn SummaryStore>` when the host wants session-only
/// caching, and as the durable layer in tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl SummaryStore for InMemoryStore {
    async fn get(&self, hash: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.read().await.get(hash).cloned())
    }

    async fn put(&self, hash: &str, summary: &str) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .insert(hash.to_string(), summary.to_string());
        Ok(())
    }

    async fn delete(&self, hash: &str) -> Result<(), StoreError> {
        self.inner.write().await.remove(hash);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.read().await.keys().cloned().collect())
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        let mut guard = self.inner.write().await;
        let n = guard.len();
        guard.clear();
        Ok(n)
    }
}
