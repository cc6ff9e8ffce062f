//! Block segmentation: split a transcript into contiguous, content-addressed blocks.

use serde::Serialize;

use crate::hasher::content_hash;
use crate::message::Message;

/// A contiguous, non-empty run of messages and its content hash.
///
/// Blocks are immutable; an edited message yields a different block with a different
/// hash, so a cached summary never outlives the content it describes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Block {
    messages: Vec<Message>,
    hash: String,
}

impl Block {
    /// Builds a block from a non-empty message run. Returns `None` for an empty run.
    pub fn new(messages: Vec<Message>) -> Option<Self> {
        if messages.is_empty() {
            return None;
        }
        let hash = content_hash(&messages);
        Some(Self { messages, hash })
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Summed character length of the block's message texts.
    pub fn char_len(&self) -> usize {
        self.messages.iter().map(Message::char_len).sum()
    }

    /// Messages rendered as `"{speaker}: {text}"`, one per line.
    pub fn render(&self) -> String {
        self.messages
            .iter()
            .map(Message::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Splits `messages` into blocks of at most `block_size_chars` characters.
///
/// System messages and messages with empty text are skipped. A message is never split:
/// one longer than the budget gets a block of its own. Output order equals input order.
pub fn segment(messages: &[Message], block_size_chars: usize) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current: Vec<Message> = Vec::new();
    let mut current_len = 0usize;

    for message in messages.iter().filter(|m| m.is_summarizable()) {
        let len = message.char_len();
        if !current.is_empty() && current_len + len > block_size_chars {
            blocks.extend(Block::new(std::mem::take(&mut current)));
            current_len = 0;
        }
        current.push(message.clone());
        current_len += len;
    }
    blocks.extend(Block::new(current));

    tracing::debug!(
        messages = messages.len(),
        blocks = blocks.len(),
        block_size_chars,
        "segmented transcript"
    );
    blocks
}
