//! Settings snapshot read by every component.
//!
//! Settings are immutable once built: the orchestrator holds an `Arc<Settings>` and an
//! update swaps in a new snapshot. [`Settings::from_map`] parses the flat `RECAP_*` key
//! map produced by the `config` crate (env > `.env` > XDG `config.toml`).

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compose::SUMMARY_PLACEHOLDER;
use crate::store::CacheBackend;

pub const KEY_ENABLED: &str = "RECAP_ENABLED";
pub const KEY_API_URL: &str = "RECAP_API_URL";
pub const KEY_BLOCK_SIZE_CHARS: &str = "RECAP_BLOCK_SIZE_CHARS";
pub const KEY_SUMMARY_SIZE_HINT: &str = "RECAP_SUMMARY_SIZE_HINT";
pub const KEY_HISTORY_BUDGET: &str = "RECAP_HISTORY_BUDGET";
pub const KEY_CHARS_PER_TOKEN: &str = "RECAP_CHARS_PER_TOKEN";
pub const KEY_TRIGGER_THRESHOLD: &str = "RECAP_TRIGGER_THRESHOLD";
pub const KEY_PROMPT_TEMPLATE: &str = "RECAP_PROMPT_TEMPLATE";
pub const KEY_CACHE_BACKEND: &str = "RECAP_CACHE_BACKEND";
pub const KEY_CACHE_PATH: &str = "RECAP_CACHE_PATH";
pub const KEY_REQUEST_TIMEOUT_SECS: &str = "RECAP_REQUEST_TIMEOUT_SECS";

/// Prefix shared by every settings key.
pub const KEY_PREFIX: &str = "RECAP_";

pub const DEFAULT_PROMPT_TEMPLATE: &str =
    "[Summary of the conversation so far]\n{{summary_content}}\n[End of summary]";

/// Invalid settings value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{key}: cannot parse {value:?}: {reason}")]
    Parse {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("{key} must be greater than zero")]
    NotPositive { key: &'static str },
    #[error("prompt template contains {0} summary placeholders; at most one is allowed")]
    TooManyPlaceholders(usize),
}

/// Summarization settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master switch; a disabled orchestrator skips every run.
    pub enabled: bool,
    /// Summarization endpoint. `None` means not configured.
    pub api_url: Option<String>,
    /// Character budget per block.
    pub block_size_chars: usize,
    /// Desired summary length, forwarded to the endpoint.
    pub summary_size_hint: u32,
    /// Prompt budget in tokens; multiplied by `chars_per_token` for the character budget.
    pub history_budget: usize,
    /// Characters-per-token estimate.
    pub chars_per_token: usize,
    /// Non-system messages since the last run that trigger a new run.
    pub trigger_threshold: usize,
    /// Template with at most one `{{summary_content}}` placeholder.
    pub prompt_template: String,
    pub cache_backend: CacheBackend,
    /// Database file (sqlite) or directory (file). Host default when `None`.
    pub cache_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: None,
            block_size_chars: 1000,
            summary_size_hint: 200,
            history_budget: 2048,
            chars_per_token: 4,
            trigger_threshold: 20,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            cache_backend: CacheBackend::default(),
            cache_path: None,
            request_timeout_secs: 60,
        }
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SettingsError::Parse {
            key,
            value: value.to_string(),
            reason: "expected true/false".to_string(),
        }),
    }
}

fn parse_num<T>(key: &'static str, value: &str) -> Result<T, SettingsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| SettingsError::Parse {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn non_blank(value: &str) -> Option<String> {
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

impl Settings {
    /// Builds settings from `RECAP_*` keys over the defaults, then validates.
    ///
    /// Unknown keys are ignored. `RECAP_PROMPT_TEMPLATE` accepts `\n` escapes.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let mut s = Self::default();
        let get = |k: &str| map.get(k).map(String::as_str);

        if let Some(v) = get(KEY_ENABLED) {
            s.enabled = parse_bool(KEY_ENABLED, v)?;
        }
        if let Some(v) = get(KEY_API_URL) {
            s.api_url = non_blank(v);
        }
        if let Some(v) = get(KEY_BLOCK_SIZE_CHARS) {
            s.block_size_chars = parse_num(KEY_BLOCK_SIZE_CHARS, v)?;
        }
        if let Some(v) = get(KEY_SUMMARY_SIZE_HINT) {
            s.summary_size_hint = parse_num(KEY_SUMMARY_SIZE_HINT, v)?;
        }
        if let Some(v) = get(KEY_HISTORY_BUDGET) {
            s.history_budget = parse_num(KEY_HISTORY_BUDGET, v)?;
        }
        if let Some(v) = get(KEY_CHARS_PER_TOKEN) {
            s.chars_per_token = parse_num(KEY_CHARS_PER_TOKEN, v)?;
        }
        if let Some(v) = get(KEY_TRIGGER_THRESHOLD) {
            s.trigger_threshold = parse_num(KEY_TRIGGER_THRESHOLD, v)?;
        }
        if let Some(v) = get(KEY_PROMPT_TEMPLATE) {
            s.prompt_template = v.replace("\\n", "\n");
        }
        if let Some(v) = get(KEY_CACHE_BACKEND) {
            s.cache_backend = v.parse().map_err(|reason| SettingsError::Parse {
                key: KEY_CACHE_BACKEND,
                value: v.to_string(),
                reason,
            })?;
        }
        if let Some(v) = get(KEY_CACHE_PATH) {
            s.cache_path = non_blank(v).map(PathBuf::from);
        }
        if let Some(v) = get(KEY_REQUEST_TIMEOUT_SECS) {
            s.request_timeout_secs = parse_num(KEY_REQUEST_TIMEOUT_SECS, v)?;
        }

        s.validate()?;
        Ok(s)
    }

    /// Checks value ranges and the template placeholder count.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = [
            (KEY_BLOCK_SIZE_CHARS, self.block_size_chars as u64),
            (KEY_SUMMARY_SIZE_HINT, u64::from(self.summary_size_hint)),
            (KEY_HISTORY_BUDGET, self.history_budget as u64),
            (KEY_CHARS_PER_TOKEN, self.chars_per_token as u64),
            (KEY_TRIGGER_THRESHOLD, self.trigger_threshold as u64),
            (KEY_REQUEST_TIMEOUT_SECS, self.request_timeout_secs),
        ];
        if let Some((key, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(SettingsError::NotPositive { key: *key });
        }
        let placeholders = self.prompt_template.matches(SUMMARY_PLACEHOLDER).count();
        if placeholders > 1 {
            return Err(SettingsError::TooManyPlaceholders(placeholders));
        }
        Ok(())
    }

    /// Prompt budget in characters (`history_budget * chars_per_token`).
    pub fn history_budget_chars(&self) -> usize {
        self.history_budget.saturating_mul(self.chars_per_token)
    }

    /// Whether an endpoint is set.
    pub fn is_configured(&self) -> bool {
        self.api_url
            .as_deref()
            .map(|u| !u.trim().is_empty())
            .unwrap_or(false)
    }
}
