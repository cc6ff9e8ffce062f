//! Host side of the `recap` binary: transcript loading and orchestrator wiring.
//!
//! The binary in `main.rs` only parses arguments and prints; everything that touches
//! files, settings, or the cache backend lives here so it can be tested directly.

pub mod host;
pub mod transcript;

pub use host::{build_orchestrator, cache_path, default_cache_path, HostError};
pub use transcript::{load_transcript, TranscriptError};
