//! Errors returned by the orchestrator's preview/edit surface.
//!
//! Per-block summarization failures never show up here: a run recovers them locally and
//! reports `had_error` on the result.

use thiserror::Error;

use crate::cache::CacheError;
use crate::settings::SettingsError;

#[derive(Debug, Error)]
pub enum RecapError {
    /// Preview requested outside `[0, total)`.
    #[error("block index {index} out of range (0..{total})")]
    IndexOutOfRange { index: usize, total: usize },

    /// Malformed request, e.g. an empty hash or summary on update.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Durable cache layer failed (write or clear).
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Settings snapshot failed validation.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
