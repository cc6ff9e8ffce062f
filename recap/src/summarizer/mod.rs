//! Summarization client abstraction.
//!
//! The orchestrator depends on a callable that turns one block into summary text; this
//! module defines the trait, the endpoint payload, the HTTP implementation, and a mock.
//!
//! Implementations make a single attempt per call. Retry policy, if any, belongs to the
//! caller.

mod http;
mod mock;

pub use http::HttpSummarizer;
pub use mock::{MockReply, MockSummarizer};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::segment::Block;
use crate::settings::Settings;

/// Errors from one summarization call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SummarizeError {
    /// No endpoint configured; no request was attempted.
    #[error("summarization endpoint is not configured")]
    NotConfigured,
    /// The endpoint could not be reached (connect, timeout, body read).
    #[error("summarization endpoint unreachable: {0}")]
    Network(String),
    /// The endpoint answered with a non-success status or an unusable body.
    #[error("summarization failed: {0}")]
    Failed(String),
}

/// Per-call parameters taken from the current settings snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SummaryHints {
    /// Endpoint URL. `None` or blank means not configured.
    pub endpoint: Option<String>,
    /// Desired summary length, forwarded as `target_summary_size`.
    pub target_summary_size: Option<u32>,
}

impl SummaryHints {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            endpoint: settings
                .api_url
                .clone()
                .filter(|_| settings.is_configured()),
            target_summary_size: Some(settings.summary_size_hint),
        }
    }

    /// Trimmed endpoint, if one is set.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// One message in `block_details`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDetail {
    pub name: String,
    pub is_user: bool,
    pub mes: String,
}

/// JSON body POSTed to the summarization endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeRequest {
    /// Block rendered as `"{speaker}: {text}"` lines.
    pub block_content: String,
    pub block_details: Vec<BlockDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_summary_size: Option<u32>,
}

impl SummarizeRequest {
    pub fn new(block: &Block, hints: &SummaryHints) -> Self {
        Self {
            block_content: block.render(),
            block_details: block
                .messages()
                .iter()
                .map(|m| BlockDetail {
                    name: m.speaker_name.clone(),
                    is_user: m.is_user,
                    mes: m.text.clone(),
                })
                .collect(),
            target_summary_size: hints.target_summary_size,
        }
    }
}

/// Success body: `{"summary": "..."}`.
#[derive(Clone, Debug, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

/// Summarizes one block.
///
/// **Interaction**: Called by [`SummaryOrchestrator`](crate::orchestrator::SummaryOrchestrator)
/// on cache misses, one call outstanding at a time.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, block: &Block, hints: &SummaryHints)
        -> Result<String, SummarizeError>;
}
