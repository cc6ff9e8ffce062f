//! Summary orchestration: segment a transcript, fill every block's summary from the
//! cache or the summarizer, and expose the preview/edit surface.
//!
//! One [`SummaryOrchestrator`] per host. It owns the cache, the in-flight flag, the
//! segmentation memo, and the trigger counter; nothing is process-global.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::cache::{CacheStats, SummaryCache};
use crate::compose::{ComposedPrompt, PromptComposer};
use crate::error::RecapError;
use crate::message::{Message, Transcript};
use crate::preview::{BlockPreview, NOT_CACHED_PLACEHOLDER};
use crate::segment::{segment, Block};
use crate::settings::Settings;
use crate::store::SummaryStore;
use crate::summarizer::{SummarizeError, Summarizer, SummaryHints};

/// Summary slot text for a block whose generation failed. `number` is 1-based.
pub fn failure_placeholder(number: usize) -> String {
    format!("[Summary generation failed for block {}]", number)
}

/// Result of a completed [`SummaryOrchestrator::summarize_all`].
///
/// `summaries[i]` belongs to `blocks[i]`; failed blocks hold a
/// [`failure_placeholder`] and are listed in `failed_blocks` (0-based).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SummaryRun {
    pub blocks: Arc<Vec<Block>>,
    pub summaries: Vec<String>,
    pub had_error: bool,
    pub failed_blocks: Vec<usize>,
}

/// What a run request did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed(SummaryRun),
    /// Another run was in flight; this request was dropped, not queued.
    AlreadyRunning,
    /// Summarization is switched off in settings.
    Disabled,
    /// No endpoint configured; the run stopped at the first block that needed one.
    NotConfigured,
    /// Trigger path only: not enough new messages since the last run.
    BelowThreshold { pending: usize, threshold: usize },
}

impl RunOutcome {
    pub fn run(&self) -> Option<&SummaryRun> {
        match self {
            Self::Completed(run) => Some(run),
            _ => None,
        }
    }
}

/// Output of [`SummaryOrchestrator::build_prompt`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptBuild {
    pub outcome: RunOutcome,
    pub prompt: ComposedPrompt,
}

/// Segmentation of the last transcript seen, shared by the run and preview paths.
struct SegmentationMemo {
    chat_id: String,
    block_size_chars: usize,
    source: Vec<Message>,
    blocks: Arc<Vec<Block>>,
}

impl SegmentationMemo {
    fn matches(&self, transcript: &Transcript, block_size_chars: usize) -> bool {
        self.chat_id == transcript.chat_id
            && self.block_size_chars == block_size_chars
            && self.source == transcript.messages
    }
}

#[derive(Default)]
struct TriggerState {
    chat_id: Option<String>,
    counted: usize,
}

/// Clears the in-flight flag when a run ends, including on early return.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives segmentation, cache lookups, and summarizer calls.
///
/// Blocks are processed strictly in order with at most one summarizer call
/// outstanding. A second run requested while one is in flight returns
/// [`RunOutcome::AlreadyRunning`].
///
/// **Interaction**: Uses [`SummaryCache`], a [`Summarizer`], and [`PromptComposer`];
/// hosts call it from their message hooks and preview UI.
pub struct SummaryOrchestrator {
    cache: SummaryCache,
    summarizer: Arc<dyn Summarizer>,
    settings: RwLock<Arc<Settings>>,
    in_progress: AtomicBool,
    memo: Mutex<Option<SegmentationMemo>>,
    trigger: Mutex<TriggerState>,
}

impl SummaryOrchestrator {
    /// Validates `settings` and builds an orchestrator over `store`.
    pub fn new(
        settings: Settings,
        store: Arc<dyn SummaryStore>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self, RecapError> {
        Self::with_cache(settings, SummaryCache::new(store), summarizer)
    }

    pub fn with_cache(
        settings: Settings,
        cache: SummaryCache,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self, RecapError> {
        settings.validate()?;
        Ok(Self {
            cache,
            summarizer,
            settings: RwLock::new(Arc::new(settings)),
            in_progress: AtomicBool::new(false),
            memo: Mutex::new(None),
            trigger: Mutex::new(TriggerState::default()),
        })
    }

    /// Current settings snapshot.
    pub async fn settings(&self) -> Arc<Settings> {
        self.settings.read().await.clone()
    }

    /// Validates and swaps in a new snapshot. Runs already in flight keep the old one.
    pub async fn update_settings(&self, settings: Settings) -> Result<(), RecapError> {
        settings.validate()?;
        let mut current = self.settings.write().await;
        if current.block_size_chars != settings.block_size_chars {
            *self.memo.lock().await = None;
        }
        *current = Arc::new(settings);
        tracing::info!("settings updated");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Blocks for `transcript`, reusing the memo when chat, content, and block size match.
    async fn blocks_for(
        &self,
        transcript: &Transcript,
        block_size_chars: usize,
    ) -> Arc<Vec<Block>> {
        let mut memo = self.memo.lock().await;
        if let Some(m) = memo.as_ref() {
            if m.matches(transcript, block_size_chars) {
                return m.blocks.clone();
            }
        }
        let blocks = Arc::new(segment(&transcript.messages, block_size_chars));
        *memo = Some(SegmentationMemo {
            chat_id: transcript.chat_id.clone(),
            block_size_chars,
            source: transcript.messages.clone(),
            blocks: blocks.clone(),
        });
        blocks
    }

    /// Produces one summary per block, in block order.
    ///
    /// Cache hits are used as-is. On a miss the summarizer is called and a success is
    /// written back; a failed write is logged and the run continues with the value held
    /// in memory. A failed block gets a placeholder and sets `had_error`.
    pub async fn summarize_all(&self, transcript: &Transcript) -> RunOutcome {
        let settings = self.settings().await;
        if !settings.enabled {
            tracing::debug!(chat_id = %transcript.chat_id, "summarization disabled");
            return RunOutcome::Disabled;
        }
        let Some(_guard) = InFlight::acquire(&self.in_progress) else {
            tracing::debug!(chat_id = %transcript.chat_id, "summarization already running");
            return RunOutcome::AlreadyRunning;
        };

        let blocks = self.blocks_for(transcript, settings.block_size_chars).await;
        let hints = SummaryHints::from_settings(&settings);
        tracing::info!(
            chat_id = %transcript.chat_id,
            blocks = blocks.len(),
            "summarization run started"
        );

        let mut summaries = Vec::with_capacity(blocks.len());
        let mut failed_blocks = Vec::new();
        for (i, block) in blocks.iter().enumerate() {
            if let Some(summary) = self.cache.get(block.hash()).await {
                tracing::debug!(block = i + 1, hash = %block.hash(), "summary cached");
                summaries.push(summary);
                continue;
            }
            match self.summarizer.summarize(block, &hints).await {
                Ok(summary) => {
                    if let Err(e) = self.cache.put(block.hash(), &summary).await {
                        tracing::warn!(
                            block = i + 1,
                            error = %e,
                            "summary kept for this session only"
                        );
                    }
                    tracing::debug!(block = i + 1, hash = %block.hash(), "summary generated");
                    summaries.push(summary);
                }
                Err(SummarizeError::NotConfigured) => {
                    tracing::info!(
                        chat_id = %transcript.chat_id,
                        "summarization endpoint not configured"
                    );
                    return RunOutcome::NotConfigured;
                }
                Err(e) => {
                    tracing::warn!(
                        block = i + 1,
                        hash = %block.hash(),
                        error = %e,
                        "block summarization failed"
                    );
                    summaries.push(failure_placeholder(i + 1));
                    failed_blocks.push(i);
                }
            }
        }

        let had_error = !failed_blocks.is_empty();
        let stats = self.cache.stats();
        tracing::info!(
            chat_id = %transcript.chat_id,
            blocks = blocks.len(),
            failed = failed_blocks.len(),
            memory_hits = stats.memory_hits,
            durable_hits = stats.durable_hits,
            misses = stats.misses,
            write_failures = stats.write_failures,
            "summarization run finished"
        );
        RunOutcome::Completed(SummaryRun {
            blocks,
            summaries,
            had_error,
            failed_blocks,
        })
    }

    /// Message-hook entry point: runs once `trigger_threshold` non-system messages have
    /// arrived since the last completed run for this chat.
    pub async fn on_messages(&self, transcript: &Transcript) -> RunOutcome {
        let threshold = self.settings().await.trigger_threshold;
        let count = transcript.non_system_count();
        let pending = {
            let mut trigger = self.trigger.lock().await;
            if trigger.chat_id.as_deref() != Some(transcript.chat_id.as_str()) {
                trigger.chat_id = Some(transcript.chat_id.clone());
                trigger.counted = 0;
            }
            // Messages deleted since the last run: count from the new length.
            trigger.counted = trigger.counted.min(count);
            count - trigger.counted
        };
        if pending < threshold {
            tracing::debug!(
                chat_id = %transcript.chat_id,
                pending,
                threshold,
                "below trigger threshold"
            );
            return RunOutcome::BelowThreshold { pending, threshold };
        }

        let outcome = self.summarize_all(transcript).await;
        if matches!(outcome, RunOutcome::Completed(_)) {
            let mut trigger = self.trigger.lock().await;
            if trigger.chat_id.as_deref() == Some(transcript.chat_id.as_str()) {
                trigger.counted = count;
            }
        }
        outcome
    }

    /// Summaries already cached for `blocks`, in order; misses are skipped.
    async fn cached_summaries(&self, blocks: &[Block]) -> Vec<String> {
        let mut out = Vec::new();
        for block in blocks {
            if let Some(s) = self.cache.get(block.hash()).await {
                out.push(s);
            }
        }
        out
    }

    /// Runs summarization and composes the prompt fragment for `transcript`.
    ///
    /// When the run does not complete (in flight or not configured) the fragment uses
    /// whatever is cached. Disabled summarization composes recent messages only.
    pub async fn build_prompt(&self, transcript: &Transcript) -> PromptBuild {
        let outcome = self.summarize_all(transcript).await;
        let settings = self.settings().await;
        let summaries = match &outcome {
            RunOutcome::Completed(run) => run.summaries.clone(),
            RunOutcome::Disabled => Vec::new(),
            _ => {
                let blocks = self.blocks_for(transcript, settings.block_size_chars).await;
                self.cached_summaries(&blocks).await
            }
        };
        let recent: Vec<Message> = transcript
            .messages
            .iter()
            .filter(|m| m.is_summarizable())
            .cloned()
            .collect();
        let prompt = PromptComposer::from_settings(&settings).compose(&summaries, &recent);
        PromptBuild { outcome, prompt }
    }

    /// Block `index` with its cached summary. Never calls the summarizer.
    pub async fn preview(
        &self,
        transcript: &Transcript,
        index: usize,
    ) -> Result<BlockPreview, RecapError> {
        let block_size = self.settings().await.block_size_chars;
        let blocks = self.blocks_for(transcript, block_size).await;
        let total = blocks.len();
        let block = blocks
            .get(index)
            .ok_or(RecapError::IndexOutOfRange { index, total })?;
        let cached = self.cache.get(block.hash()).await;
        Ok(BlockPreview {
            index,
            total_blocks: total,
            hash: block.hash().to_string(),
            block_text: block.render(),
            cached: cached.is_some(),
            summary_text: cached.unwrap_or_else(|| NOT_CACHED_PLACEHOLDER.to_string()),
        })
    }

    /// Overwrites the summary for `hash` (manual correction).
    ///
    /// The memory layer is updated even when the durable write fails; the error is
    /// still returned so the host can tell the user.
    pub async fn update_summary(&self, hash: &str, text: &str) -> Result<(), RecapError> {
        if hash.trim().is_empty() {
            return Err(RecapError::InvalidInput("hash must not be empty".into()));
        }
        if text.trim().is_empty() {
            return Err(RecapError::InvalidInput("summary must not be empty".into()));
        }
        self.cache.put(hash, text).await?;
        tracing::info!(hash, "summary updated");
        Ok(())
    }

    /// Drops every cached summary.
    pub async fn clear_cache(&self) -> Result<(), RecapError> {
        Ok(self.cache.clear().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::summarizer::{MockReply, MockSummarizer};

    fn transcript() -> Transcript {
        Transcript::new(
            "chat",
            vec![
                Message::user("U", "hi"),
                Message::assistant("A", "hello"),
                Message::user("U", "x".repeat(1500)),
            ],
        )
    }

    fn orchestrator(mock: Arc<MockSummarizer>) -> SummaryOrchestrator {
        SummaryOrchestrator::new(Settings::default(), Arc::new(InMemoryStore::new()), mock)
            .unwrap()
    }

    #[test]
    fn placeholder_is_one_based() {
        assert_eq!(failure_placeholder(2), "[Summary generation failed for block 2]");
    }

    #[tokio::test]
    async fn second_run_hits_cache() {
        let mock = Arc::new(MockSummarizer::echo());
        let orch = orchestrator(mock.clone());
        let first = orch.summarize_all(&transcript()).await;
        let second = orch.summarize_all(&transcript()).await;
        assert_eq!(first.run().unwrap().summaries, second.run().unwrap().summaries);
        assert_eq!(mock.call_count().await, 2);
    }

    #[tokio::test]
    async fn disabled_skips_everything() {
        let mock = Arc::new(MockSummarizer::echo());
        let orch = SummaryOrchestrator::new(
            Settings {
                enabled: false,
                ..Settings::default()
            },
            Arc::new(InMemoryStore::new()),
            mock.clone(),
        )
        .unwrap();
        assert_eq!(orch.summarize_all(&transcript()).await, RunOutcome::Disabled);
        assert_eq!(mock.call_count().await, 0);
    }

    #[tokio::test]
    async fn memo_is_reused_for_same_transcript() {
        let orch = orchestrator(Arc::new(MockSummarizer::echo()));
        let a = orch.blocks_for(&transcript(), 1000).await;
        let b = orch.blocks_for(&transcript(), 1000).await;
        assert!(Arc::ptr_eq(&a, &b));
        let c = orch.blocks_for(&transcript(), 10).await;
        assert!(!Arc::ptr_eq(&a, &c));
        let other = Transcript::new("other", transcript().messages);
        let d = orch.blocks_for(&other, 10).await;
        assert!(!Arc::ptr_eq(&c, &d));
        assert_eq!(*c, *d);
    }

    #[tokio::test]
    async fn failed_block_is_not_cached() {
        let mock = Arc::new(MockSummarizer::scripted(vec![MockReply::Fail("boom".into())]));
        let orch = orchestrator(mock.clone());
        let run = orch.summarize_all(&transcript()).await;
        let run = run.run().unwrap();
        assert_eq!(run.failed_blocks, vec![0]);
        // The retry only calls the summarizer for the block that failed.
        let retry = orch.summarize_all(&transcript()).await;
        assert!(!retry.run().unwrap().had_error);
        assert_eq!(mock.call_count().await, 3);
    }

    #[tokio::test]
    async fn invalid_settings_update_keeps_old_snapshot() {
        let orch = orchestrator(Arc::new(MockSummarizer::echo()));
        let err = orch
            .update_settings(Settings {
                block_size_chars: 0,
                ..Settings::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RecapError::Settings(_)));
        assert_eq!(orch.settings().await.block_size_chars, 1000);
    }

    #[tokio::test]
    async fn in_flight_flag_is_released_after_run() {
        let orch = orchestrator(Arc::new(MockSummarizer::echo()));
        orch.summarize_all(&transcript()).await;
        assert!(!orch.is_running());
    }
}
