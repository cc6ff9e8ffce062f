//! Transcript files: a JSON array of `{name, is_user, mes, is_system?}` messages.

use std::path::{Path, PathBuf};

use recap::{Message, Transcript};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("read transcript {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse transcript {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Chat id for a transcript file: the file stem, or `"default"` when there is none.
fn chat_id_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("default")
        .to_string()
}

/// Loads `path` as a transcript. `chat_id` defaults to the file stem.
pub fn load_transcript(path: &Path, chat_id: Option<&str>) -> Result<Transcript, TranscriptError> {
    let content = std::fs::read_to_string(path).map_err(|source| TranscriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let messages: Vec<Message> =
        serde_json::from_str(&content).map_err(|source| TranscriptError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let chat_id = chat_id
        .map(str::to_string)
        .unwrap_or_else(|| chat_id_from_path(path));
    tracing::debug!(chat_id = %chat_id, messages = messages.len(), "transcript loaded");
    Ok(Transcript::new(chat_id, messages))
}
