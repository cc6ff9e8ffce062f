//! Mock summarizer for tests and offline runs.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{SummarizeError, Summarizer, SummaryHints};
use crate::segment::Block;

/// What the mock answers for one call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockReply {
    /// Return this summary.
    Summary(String),
    /// Fail with [`SummarizeError::Failed`] carrying this message.
    Fail(String),
    /// Summary derived from the block: `"summary of N messages: <first text>"`.
    Echo,
}

/// Scripted summarizer: replies come from a queue, then from a fallback.
///
/// Records the hash of every block it was asked to summarize, in call order.
pub struct MockSummarizer {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockSummarizer {
    /// Replies from `script` in order, then [`MockReply::Echo`].
    pub fn scripted(script: Vec<MockReply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: MockReply::Echo,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always [`MockReply::Echo`].
    pub fn echo() -> Self {
        Self::scripted(vec![])
    }

    /// Always the same summary.
    pub fn fixed(summary: impl Into<String>) -> Self {
        Self {
            fallback: MockReply::Summary(summary.into()),
            ..Self::echo()
        }
    }

    /// Always fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fallback: MockReply::Fail(message.into()),
            ..Self::echo()
        }
    }

    /// Sleeps before answering each call (for in-flight tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Hashes of summarized blocks, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

fn echo_summary(block: &Block) -> String {
    let first = block
        .messages()
        .first()
        .map(|m| m.text.chars().take(40).collect::<String>())
        .unwrap_or_default();
    format!("summary of {} messages: {}", block.messages().len(), first)
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(
        &self,
        block: &Block,
        _hints: &SummaryHints,
    ) -> Result<String, SummarizeError> {
        self.calls.lock().await.push(block.hash().to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match reply {
            MockReply::Summary(s) => Ok(s),
            MockReply::Fail(msg) => Err(SummarizeError::Failed(msg)),
            MockReply::Echo => Ok(echo_summary(block)),
        }
    }
}
