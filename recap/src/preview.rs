//! Block preview for inspection and manual editing.

use serde::Serialize;

/// Summary text shown for a block that has no cached summary yet.
pub const NOT_CACHED_PLACEHOLDER: &str = "[No summary cached for this block yet]";

/// One block as shown to a preview UI. Produced without calling the summarizer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BlockPreview {
    pub index: usize,
    pub total_blocks: usize,
    pub hash: String,
    /// Block rendered as `"{speaker}: {text}"` lines.
    pub block_text: String,
    /// Cached summary, or [`NOT_CACHED_PLACEHOLDER`].
    pub summary_text: String,
    /// Whether `summary_text` came from the cache.
    pub cached: bool,
}

/// Caller-owned navigation state for a preview UI.
///
/// Reset whenever the chat changes; blocks of one chat mean nothing in another.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PreviewState {
    pub chat_id: Option<String>,
    pub current_index: usize,
    pub total_blocks: usize,
    pub current_hash: Option<String>,
}

impl PreviewState {
    /// Clears the state if `chat_id` differs from the tracked chat. Returns `true` on reset.
    pub fn reset_for(&mut self, chat_id: &str) -> bool {
        if self.chat_id.as_deref() == Some(chat_id) {
            return false;
        }
        *self = Self {
            chat_id: Some(chat_id.to_string()),
            ..Self::default()
        };
        true
    }

    /// Records the block currently on screen.
    pub fn apply(&mut self, preview: &BlockPreview) {
        self.current_index = preview.index;
        self.total_blocks = preview.total_blocks;
        self.current_hash = Some(preview.hash.clone());
    }

    pub fn next_index(&self) -> Option<usize> {
        let next = self.current_index + 1;
        (next < self.total_blocks).then_some(next)
    }

    pub fn prev_index(&self) -> Option<usize> {
        if self.total_blocks == 0 {
            return None;
        }
        self.current_index.checked_sub(1)
    }
}
