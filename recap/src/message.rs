//! Transcript messages as read from the host chat.
//!
//! The host owns the message store; recap only reads. Serde names follow the
//! summarization endpoint's `block_details` shape (`name`, `is_user`, `mes`) so a
//! transcript file and a request payload use the same field names.

use serde::{Deserialize, Serialize};

/// One chat message.
///
/// **Interaction**: Input to [`segment`](crate::segment::segment) and
/// [`assemble`](crate::compose::assemble); rendered as `"{speaker}: {text}"` in
/// summarization requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Display name of the speaker.
    #[serde(rename = "name")]
    pub speaker_name: String,
    /// `true` for the human side of the chat.
    pub is_user: bool,
    /// Message body.
    #[serde(rename = "mes")]
    pub text: String,
    /// System / meta message; never segmented or summarized.
    #[serde(default)]
    pub is_system: bool,
}

impl Message {
    /// User message.
    pub fn user(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker_name: speaker.into(),
            is_user: true,
            text: text.into(),
            is_system: false,
        }
    }

    /// Non-user (character / assistant) message.
    pub fn assistant(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker_name: speaker.into(),
            is_user: false,
            text: text.into(),
            is_system: false,
        }
    }

    /// System / meta message.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            speaker_name: "System".to_string(),
            is_user: false,
            text: text.into(),
            is_system: true,
        }
    }

    /// Length used for every budget calculation: character count, not bytes or tokens.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// `"{speaker}: {text}"`.
    pub fn render(&self) -> String {
        format!("{}: {}", self.speaker_name, self.text)
    }

    /// Whether the message takes part in segmentation (non-system, non-empty).
    pub fn is_summarizable(&self) -> bool {
        !self.is_system && !self.text.is_empty()
    }
}

/// A chat as seen by the orchestrator: identity plus its ordered messages.
///
/// `chat_id` scopes the segmentation memo and trigger counter; a different id means a
/// different chat even when the messages are identical.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub chat_id: String,
    pub messages: Vec<Message>,
}

impl Transcript {
    pub fn new(chat_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            chat_id: chat_id.into(),
            messages,
        }
    }

    /// Number of non-system messages; drives the trigger threshold.
    pub fn non_system_count(&self) -> usize {
        self.messages.iter().filter(|m| !m.is_system).count()
    }
}
