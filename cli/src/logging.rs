//! Logging initialization: stdout is reserved for command output.
//!
//! Reads `RUST_LOG` (level) and `LOG_FILE` (path) from the environment.
//! When `LOG_FILE` is set, logs are appended to that file without ANSI colors;
//! otherwise they go to stderr.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// - **RUST_LOG**: filter, e.g. `info`, `recap=debug`. Default: `warn`.
/// - **LOG_FILE**: append to this file instead of stderr.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    if let Ok(path) = std::env::var("LOG_FILE") {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_filter(filter);
        tracing_subscriber::registry().with(file_layer).init();
        tracing::info!(path = %path, "recap logging to file");
    } else {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(filter);
        tracing_subscriber::registry().with(stderr_layer).init();
    }
    Ok(())
}
