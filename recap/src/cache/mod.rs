//! Content-addressed summary cache.
//!
//! Two layers: a process-local [`DashMap`] fast path and a durable [`SummaryStore`].
//! Reads go memory → durable (promoting durable hits); writes go memory → durable.
//! The memory layer is authoritative for the session when the durable layer fails.

mod error;

pub use error::CacheError;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::store::SummaryStore;

/// Snapshot of cache counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Hits served from the in-memory layer.
    pub memory_hits: u64,
    /// Hits served from the durable layer (then promoted to memory).
    pub durable_hits: u64,
    pub misses: u64,
    /// Durable reads that failed and were treated as misses.
    pub read_failures: u64,
    pub writes: u64,
    /// Durable writes that failed (memory layer kept the value).
    pub write_failures: u64,
    /// Entries currently in the memory layer.
    pub memory_entries: usize,
}

#[derive(Default)]
struct Counters {
    memory_hits: AtomicU64,
    durable_hits: AtomicU64,
    misses: AtomicU64,
    read_failures: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Block hash → summary cache with an in-memory layer over a durable store.
///
/// Operations on different hashes never contend on a shared lock. Writes to the same
/// hash are last-writer-wins.
///
/// **Interaction**: Owned by [`SummaryOrchestrator`](crate::orchestrator::SummaryOrchestrator).
pub struct SummaryCache {
    memory: DashMap<String, String>,
    durable: Arc<dyn SummaryStore>,
    counters: Counters,
    /// Bumped by `clear`; a durable read that spans a clear is not promoted.
    epoch: AtomicU64,
}

impl SummaryCache {
    pub fn new(durable: Arc<dyn SummaryStore>) -> Self {
        Self {
            memory: DashMap::new(),
            durable,
            counters: Counters::default(),
            epoch: AtomicU64::new(0),
        }
    }

    /// Summary for `hash`, or `None` if it was never stored or the cache was cleared.
    ///
    /// A durable read error is logged and counted as a miss.
    pub async fn get(&self, hash: &str) -> Option<String> {
        if let Some(summary) = self.memory.get(hash) {
            bump(&self.counters.memory_hits);
            tracing::debug!(hash, "summary cache hit (memory)");
            return Some(summary.value().clone());
        }

        let epoch = self.epoch.load(Ordering::Acquire);
        match self.durable.get(hash).await {
            Ok(Some(summary)) => {
                if self.epoch.load(Ordering::Acquire) == epoch {
                    self.memory.insert(hash.to_string(), summary.clone());
                    if self.epoch.load(Ordering::Acquire) == epoch {
                        bump(&self.counters.durable_hits);
                        tracing::debug!(hash, "summary cache hit (durable)");
                        return Some(summary);
                    }
                    // A clear landed between the check and the insert.
                    self.memory.remove_if(hash, |_, v| *v == summary);
                }
                bump(&self.counters.misses);
                tracing::debug!(hash, "summary cache cleared during read; miss");
                None
            }
            Ok(None) => {
                bump(&self.counters.misses);
                tracing::debug!(hash, "summary cache miss");
                None
            }
            Err(e) => {
                bump(&self.counters.read_failures);
                bump(&self.counters.misses);
                tracing::warn!(
                    hash,
                    error = %e,
                    "durable summary read failed; treating as miss"
                );
                None
            }
        }
    }

    /// Stores `summary` under `hash`.
    ///
    /// The memory layer is written first and is never rolled back; an `Err` means only
    /// the durable write failed.
    pub async fn put(&self, hash: &str, summary: &str) -> Result<(), CacheError> {
        self.memory.insert(hash.to_string(), summary.to_string());
        bump(&self.counters.writes);

        if let Err(source) = self.durable.put(hash, summary).await {
            bump(&self.counters.write_failures);
            tracing::warn!(
                hash,
                error = %source,
                "durable summary write failed; kept in memory"
            );
            return Err(CacheError::Write {
                hash: hash.to_string(),
                source,
            });
        }
        Ok(())
    }

    /// Empties the memory layer, then removes every durable entry.
    ///
    /// A `get` whose durable read overlaps the clear returns `None` and promotes nothing.
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.memory.clear();
        match self.durable.delete_all().await {
            Ok(removed) => {
                tracing::info!(removed, "summary cache cleared");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "summary cache clear incomplete");
                Err(CacheError::Clear(e))
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            memory_hits: c.memory_hits.load(Ordering::Relaxed),
            durable_hits: c.durable_hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            read_failures: c.read_failures.load(Ordering::Relaxed),
            writes: c.writes.load(Ordering::Relaxed),
            write_failures: c.write_failures.load(Ordering::Relaxed),
            memory_entries: self.memory.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, StoreError};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Durable layer that fails every operation.
    struct BrokenStore;

    #[async_trait]
    impl SummaryStore for BrokenStore {
        async fn get(&self, _hash: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Storage("disk gone".into()))
        }
        async fn put(&self, _hash: &str, _summary: &str) -> Result<(), StoreError> {
            Err(StoreError::Storage("disk gone".into()))
        }
        async fn delete(&self, _hash: &str) -> Result<(), StoreError> {
            Err(StoreError::Storage("disk gone".into()))
        }
        async fn keys(&self) -> Result<Vec<String>, StoreError> {
            Ok(vec!["h1".into()])
        }
    }

    /// Durable layer whose reads take a while.
    struct SlowStore {
        inner: InMemoryStore,
        delay: Duration,
    }

    #[async_trait]
    impl SummaryStore for SlowStore {
        async fn get(&self, hash: &str) -> Result<Option<String>, StoreError> {
            let found = self.inner.get(hash).await;
            tokio::time::sleep(self.delay).await;
            found
        }
        async fn put(&self, hash: &str, summary: &str) -> Result<(), StoreError> {
            self.inner.put(hash, summary).await
        }
        async fn delete(&self, hash: &str) -> Result<(), StoreError> {
            self.inner.delete(hash).await
        }
        async fn keys(&self) -> Result<Vec<String>, StoreError> {
            self.inner.keys().await
        }
    }

    #[tokio::test]
    async fn read_spanning_clear_is_not_promoted() {
        let durable = InMemoryStore::new();
        durable.put("h1", "old").await.unwrap();
        let cache = Arc::new(SummaryCache::new(Arc::new(SlowStore {
            inner: durable.clone(),
            delay: Duration::from_millis(100),
        })));

        let reader = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get("h1").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.clear().await.unwrap();

        assert!(reader.await.unwrap().is_none());
        assert!(durable.is_empty().await);
        assert_eq!(cache.stats().memory_entries, 0);
        assert!(cache.get("h1").await.is_none());
    }

    #[tokio::test]
    async fn put_then_get() {
        let cache = SummaryCache::new(Arc::new(InMemoryStore::new()));
        cache.put("h1", "s1").await.unwrap();
        assert_eq!(cache.get("h1").await.as_deref(), Some("s1"));
        assert_eq!(cache.stats().memory_hits, 1);
    }

    #[tokio::test]
    async fn durable_hit_is_promoted_to_memory() {
        let durable = InMemoryStore::new();
        durable.put("h1", "from disk").await.unwrap();
        let cache = SummaryCache::new(Arc::new(durable));

        assert_eq!(cache.get("h1").await.as_deref(), Some("from disk"));
        assert_eq!(cache.get("h1").await.as_deref(), Some("from disk"));
        let stats = cache.stats();
        assert_eq!(stats.durable_hits, 1);
        assert_eq!(stats.memory_hits, 1);
        assert_eq!(stats.memory_entries, 1);
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let cache = SummaryCache::new(Arc::new(InMemoryStore::new()));
        assert!(cache.get("nope").await.is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn durable_write_failure_keeps_memory_value() {
        let cache = SummaryCache::new(Arc::new(BrokenStore));
        let err = cache.put("h1", "s1").await.unwrap_err();
        assert!(matches!(err, CacheError::Write { ref hash, .. } if hash == "h1"));
        assert_eq!(cache.get("h1").await.as_deref(), Some("s1"));
        assert_eq!(cache.stats().write_failures, 1);
    }

    #[tokio::test]
    async fn durable_read_failure_is_a_miss() {
        let cache = SummaryCache::new(Arc::new(BrokenStore));
        assert!(cache.get("h1").await.is_none());
        assert_eq!(cache.stats().read_failures, 1);
    }

    #[tokio::test]
    async fn clear_failure_still_empties_memory() {
        let cache = SummaryCache::new(Arc::new(BrokenStore));
        let _ = cache.put("h1", "s1").await;
        let err = cache.clear().await.unwrap_err();
        assert!(matches!(
            err,
            CacheError::Clear(StoreError::PartialClear {
                removed: 0,
                failed: 1
            })
        ));
        assert_eq!(cache.stats().memory_entries, 0);
        assert!(cache.get("h1").await.is_none());
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let durable = InMemoryStore::new();
        let cache = SummaryCache::new(Arc::new(durable.clone()));
        cache.put("a", "1").await.unwrap();
        cache.put("b", "2").await.unwrap();
        cache.clear().await.unwrap();
        assert!(cache.get("a").await.is_none());
        assert!(cache.get("b").await.is_none());
        assert!(durable.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_puts_on_distinct_hashes() {
        let cache = Arc::new(SummaryCache::new(Arc::new(InMemoryStore::new())));
        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let hash = format!("h{}", i);
                cache.put(&hash, &format!("s{}", i)).await.unwrap();
                cache.get(&hash).await
            }));
        }
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.await.unwrap(), Some(format!("s{}", i)));
        }
    }
}
