//! Builds a [`SummaryOrchestrator`] from a settings snapshot: cache backend at its path,
//! HTTP summarizer with the configured timeout.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use recap::{
    CacheBackend, HttpSummarizer, RecapError, Settings, StoreError, SummarizeError,
    SummaryOrchestrator,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("no data directory on this platform; set RECAP_CACHE_PATH")]
    NoDataDir,
    #[error("open summary cache: {0}")]
    Store(#[from] StoreError),
    #[error("build summarizer: {0}")]
    Summarizer(#[from] SummarizeError),
    #[error(transparent)]
    Recap(#[from] RecapError),
}

/// `<data_dir>/recap/summaries.db` for sqlite, `<data_dir>/recap/summaries/` for file.
pub fn default_cache_path(backend: CacheBackend) -> Option<PathBuf> {
    let base = dirs::data_dir()?.join("recap");
    Some(match backend {
        CacheBackend::File => base.join("summaries"),
        CacheBackend::Sqlite | CacheBackend::Memory => base.join("summaries.db"),
    })
}

/// Configured cache path, else the platform default.
pub fn cache_path(settings: &Settings) -> Result<PathBuf, HostError> {
    match (&settings.cache_path, settings.cache_backend) {
        (Some(path), _) => Ok(path.clone()),
        (None, CacheBackend::Memory) => Ok(PathBuf::new()),
        (None, backend) => default_cache_path(backend).ok_or(HostError::NoDataDir),
    }
}

pub fn build_orchestrator(settings: Settings) -> Result<SummaryOrchestrator, HostError> {
    let path = cache_path(&settings)?;
    let store = settings.cache_backend.open(&path)?;
    tracing::debug!(
        backend = ?settings.cache_backend,
        path = %path.display(),
        "summary cache opened"
    );
    let summarizer =
        HttpSummarizer::with_timeout(Duration::from_secs(settings.request_timeout_secs))?;
    Ok(SummaryOrchestrator::new(settings, store, Arc::new(summarizer))?)
}
