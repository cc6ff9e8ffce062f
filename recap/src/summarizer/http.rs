//! HTTP summarizer: POSTs a block to the configured endpoint and reads `{"summary"}`.

use std::time::Duration;

use async_trait::async_trait;

use super::{SummarizeError, SummarizeRequest, SummarizeResponse, Summarizer, SummaryHints};
use crate::segment::Block;

/// Longest error body echoed into a diagnostic.
const ERROR_BODY_MAX_CHARS: usize = 500;

fn excerpt(body: &str) -> String {
    if body.chars().count() > ERROR_BODY_MAX_CHARS {
        let cut: String = body.chars().take(ERROR_BODY_MAX_CHARS).collect();
        format!("{}...", cut)
    } else {
        body.to_string()
    }
}

/// Reqwest-based summarizer.
///
/// The endpoint comes from [`SummaryHints`] on every call, so a settings change takes
/// effect without rebuilding the client.
#[derive(Clone, Default)]
pub struct HttpSummarizer {
    client: reqwest::Client,
}

impl HttpSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client with a whole-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, SummarizeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SummarizeError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(
        &self,
        block: &Block,
        hints: &SummaryHints,
    ) -> Result<String, SummarizeError> {
        let endpoint = hints.endpoint().ok_or(SummarizeError::NotConfigured)?;
        let body = SummarizeRequest::new(block, hints);

        tracing::debug!(
            endpoint,
            hash = block.hash(),
            messages = body.block_details.len(),
            "sending summarization request"
        );

        let res = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| SummarizeError::Network(e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| SummarizeError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(SummarizeError::Failed(format!(
                "endpoint returned {}: {}",
                status,
                excerpt(&text)
            )));
        }

        let parsed: SummarizeResponse = serde_json::from_str(&text).map_err(|e| {
            SummarizeError::Failed(format!("malformed response ({}): {}", e, excerpt(&text)))
        })?;
        let summary = parsed.summary.trim();
        if summary.is_empty() {
            return Err(SummarizeError::Failed("endpoint returned an empty summary".into()));
        }
        Ok(summary.to_string())
    }
}
