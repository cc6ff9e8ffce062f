//! Prompt composition: block summaries in a template, then as many recent raw messages
//! as fit the remaining character budget.

use crate::message::Message;
use crate::settings::Settings;

/// Placeholder replaced by the combined summary.
pub const SUMMARY_PLACEHOLDER: &str = "{{summary_content}}";

/// Separator between block summaries.
pub const SUMMARY_SEPARATOR: &str = "\n\n";

/// Overhead per kept message on top of name and text (`": "` / newline).
const MESSAGE_OVERHEAD_CHARS: usize = 2;

/// Budget cost of one message: `len(name) + 2 + len(text)` in characters.
pub fn message_cost(message: &Message) -> usize {
    message.speaker_name.chars().count() + MESSAGE_OVERHEAD_CHARS + message.char_len()
}

/// Keeps the longest suffix of `chat_tail` whose total cost fits `remaining_budget`.
///
/// Walks newest to oldest and stops at the first message that would overflow; that
/// message and everything older are dropped. The result is in chronological order.
pub fn assemble(chat_tail: &[Message], remaining_budget: usize) -> Vec<Message> {
    let mut used = 0usize;
    let mut kept = 0usize;
    for message in chat_tail.iter().rev() {
        let cost = message_cost(message);
        if used + cost > remaining_budget {
            break;
        }
        used += cost;
        kept += 1;
    }
    chat_tail[chat_tail.len() - kept..].to_vec()
}

/// Output of [`PromptComposer::compose`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComposedPrompt {
    /// Template with the combined summary substituted; empty when there are no summaries.
    pub summary_section: String,
    /// Recent messages kept within budget, chronological.
    pub recent: Vec<Message>,
    /// Character budget that was available for `recent`.
    pub remaining_budget: usize,
}

impl ComposedPrompt {
    /// Final prompt fragment: summary section, a blank line, then `"{speaker}: {text}"`
    /// lines. Empty parts are omitted, so no summaries and no messages give `""`.
    pub fn text(&self) -> String {
        let recent = self
            .recent
            .iter()
            .map(Message::render)
            .collect::<Vec<_>>()
            .join("\n");
        match (self.summary_section.is_empty(), recent.is_empty()) {
            (true, _) => recent,
            (false, true) => self.summary_section.clone(),
            (false, false) => format!("{}\n\n{}", self.summary_section, recent),
        }
    }
}

/// Builds the bounded prompt fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptComposer {
    template: String,
    budget_chars: usize,
}

impl PromptComposer {
    /// `history_budget` is in tokens; the character budget is
    /// `history_budget * chars_per_token`.
    pub fn new(
        template: impl Into<String>,
        history_budget: usize,
        chars_per_token: usize,
    ) -> Self {
        Self {
            template: template.into(),
            budget_chars: history_budget.saturating_mul(chars_per_token),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            template: settings.prompt_template.clone(),
            budget_chars: settings.history_budget_chars(),
        }
    }

    /// Summaries joined by a blank line and substituted into the template.
    ///
    /// No summaries (or only empty ones) give `""`. A template without the placeholder
    /// is returned verbatim and the summaries are dropped.
    pub fn render_summary(&self, summaries: &[String]) -> String {
        let combined = summaries.join(SUMMARY_SEPARATOR);
        if combined.trim().is_empty() {
            return String::new();
        }
        if !self.template.contains(SUMMARY_PLACEHOLDER) {
            tracing::warn!(
                "prompt template has no {} placeholder; summary dropped",
                SUMMARY_PLACEHOLDER
            );
            return self.template.clone();
        }
        self.template.replacen(SUMMARY_PLACEHOLDER, &combined, 1)
    }

    /// `max(0, history_budget * chars_per_token - len(summary_section))`.
    pub fn remaining_budget(&self, summary_section: &str) -> usize {
        self.budget_chars.saturating_sub(summary_section.chars().count())
    }

    pub fn compose(&self, summaries: &[String], recent_messages: &[Message]) -> ComposedPrompt {
        let summary_section = self.render_summary(summaries);
        let remaining_budget = self.remaining_budget(&summary_section);
        let recent = assemble(recent_messages, remaining_budget);
        tracing::debug!(
            summaries = summaries.len(),
            summary_chars = summary_section.chars().count(),
            remaining_budget,
            kept = recent.len(),
            offered = recent_messages.len(),
            "composed prompt"
        );
        ComposedPrompt {
            summary_section,
            recent,
            remaining_budget,
        }
    }
}
