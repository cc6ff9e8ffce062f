//! # Recap
//!
//! Incremental summarization of long chat transcripts. A transcript is cut into
//! contiguous, content-addressed blocks; each block is summarized once by a remote
//! endpoint and the summary is cached under the block's hash, so later runs only pay
//! for blocks that changed. Summaries and the most recent raw messages are then fitted
//! into a bounded prompt fragment.
//!
//! ## Design principles
//!
//! - **Content addressing**: a block's identity is the SHA-256 of its `(is_user, text)`
//!   pairs. Edit a message and the block gets a new hash; stale summaries are never served.
//! - **Two cache layers**: in-memory first, durable second. Durable failures degrade to
//!   session-only caching instead of failing the run.
//! - **Partial failure is local**: a block that cannot be summarized gets a placeholder and
//!   the run continues.
//! - **One run at a time**: a trigger while a run is in flight is dropped, not queued.
//!
//! ## Main modules
//!
//! - [`message`]: [`Message`], [`Transcript`].
//! - [`hasher`]: [`content_hash`].
//! - [`segment`]: [`segment()`], [`Block`].
//! - [`store`]: [`SummaryStore`] with [`InMemoryStore`], [`SqliteStore`], [`FileStore`].
//! - [`cache`]: [`SummaryCache`], [`CacheStats`].
//! - [`summarizer`]: [`Summarizer`] trait, [`HttpSummarizer`], [`MockSummarizer`].
//! - [`orchestrator`]: [`SummaryOrchestrator`], [`RunOutcome`], [`SummaryRun`].
//! - [`compose`]: [`PromptComposer`], [`assemble`].
//! - [`preview`]: [`BlockPreview`], [`PreviewState`].
//! - [`settings`]: [`Settings`], parsed from `RECAP_*` keys.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use recap::{HttpSummarizer, InMemoryStore, Message, Settings, SummaryOrchestrator, Transcript};
//!
//! # async fn run() -> Result<(), recap::RecapError> {
//! let settings = Settings {
//!     api_url: Some("http://localhost:5000/summarize".into()),
//!     ..Settings::default()
//! };
//! let orchestrator = SummaryOrchestrator::new(
//!     settings,
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(HttpSummarizer::new()),
//! )?;
//! let transcript = Transcript::new("chat-1", vec![Message::user("Ann", "hi")]);
//! let built = orchestrator.build_prompt(&transcript).await;
//! println!("{}", built.prompt.text());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod compose;
pub mod error;
pub mod hasher;
pub mod message;
pub mod orchestrator;
pub mod preview;
pub mod segment;
pub mod settings;
pub mod store;
pub mod summarizer;

pub use cache::{CacheError, CacheStats, SummaryCache};
pub use compose::{assemble, ComposedPrompt, PromptComposer, SUMMARY_PLACEHOLDER};
pub use error::RecapError;
pub use hasher::content_hash;
pub use message::{Message, Transcript};
pub use orchestrator::{
    failure_placeholder, PromptBuild, RunOutcome, SummaryOrchestrator, SummaryRun,
};
pub use preview::{BlockPreview, PreviewState, NOT_CACHED_PLACEHOLDER};
pub use segment::{segment, Block};
pub use settings::{Settings, SettingsError};
pub use store::{CacheBackend, FileStore, InMemoryStore, SqliteStore, StoreError, SummaryStore};
pub use summarizer::{
    HttpSummarizer, MockReply, MockSummarizer, SummarizeError, SummarizeRequest,
    SummarizeResponse, Summarizer, SummaryHints,
};
