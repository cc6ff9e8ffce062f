//! Summary cache errors.

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by [`SummaryCache`](super::SummaryCache).
///
/// Reads never fail: a durable read error is logged and treated as a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The durable layer rejected a write. The in-memory layer still holds the value.
    #[error("durable cache write failed for {hash}: {source}")]
    Write {
        hash: String,
        #[source]
        source: StoreError,
    },
    /// The durable layer could not be fully cleared. The in-memory layer is empty.
    #[error("durable cache clear failed: {0}")]
    Clear(#[source] StoreError),
}
