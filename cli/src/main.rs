//! Recap CLI binary: summarize, preview, and edit block summaries of a transcript file.
//!
//! Subcommands: `summarize`, `prompt`, `preview`, `edit`, `clear`, `settings`.

mod logging;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use recap::settings::KEY_PREFIX;
use recap::{RunOutcome, Settings, SummaryOrchestrator};
use recap_cli::{build_orchestrator, cache_path, load_transcript};

#[derive(Parser, Debug)]
#[command(name = "recap")]
#[command(about = "Recap: block-cached summaries of long chat transcripts")]
struct Args {
    #[command(subcommand)]
    cmd: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// With --json, pretty-print (multi-line)
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(clap::Args, Debug, Clone)]
struct TranscriptArgs {
    /// Transcript JSON file: array of {name, is_user, mes, is_system?}
    #[arg(value_name = "FILE")]
    transcript: PathBuf,

    /// Chat identity (default: file stem)
    #[arg(long, value_name = "ID")]
    chat_id: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Summarize every block, using cached summaries where present
    Summarize(TranscriptArgs),
    /// Summarize, then print the bounded prompt fragment
    Prompt(TranscriptArgs),
    /// Show one block and its cached summary (no endpoint calls)
    Preview(PreviewArgs),
    /// Overwrite the cached summary for a block hash
    Edit(EditArgs),
    /// Remove every cached summary
    Clear,
    /// Print the resolved settings and where each value came from
    Settings,
}

#[derive(clap::Args, Debug, Clone)]
struct PreviewArgs {
    #[command(flatten)]
    transcript: TranscriptArgs,

    /// Block number, starting at 1
    #[arg(
        long,
        value_name = "N",
        default_value_t = 1,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    block: u64,
}

#[derive(clap::Args, Debug, Clone)]
struct EditArgs {
    /// Block hash (see `recap preview`)
    #[arg(long, value_name = "HASH")]
    hash: String,

    /// New summary text
    #[arg(long, value_name = "TEXT")]
    text: String,
}

/// Writes JSON to stdout. When pretty is true, multi-line; else one line.
fn print_json<T: serde::Serialize>(
    value: &T,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let s = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", s);
    Ok(())
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

/// Error for outcomes that mean nothing was summarized.
fn outcome_error(outcome: &RunOutcome) -> Option<String> {
    match outcome {
        RunOutcome::Disabled => Some("summarization is disabled (RECAP_ENABLED=false)".into()),
        RunOutcome::NotConfigured => {
            Some("no summarization endpoint configured (set RECAP_API_URL)".into())
        }
        RunOutcome::AlreadyRunning => Some("a summarization run is already in progress".into()),
        RunOutcome::Completed(_) | RunOutcome::BelowThreshold { .. } => None,
    }
}

async fn summarize(
    orch: &SummaryOrchestrator,
    t: &TranscriptArgs,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let transcript = load_transcript(&t.transcript, t.chat_id.as_deref())?;
    let outcome = orch.summarize_all(&transcript).await;
    if args.json {
        print_json(&outcome, args.pretty)?;
    }
    if let Some(msg) = outcome_error(&outcome) {
        return Err(msg.into());
    }
    let Some(run) = outcome.run() else {
        return Ok(());
    };
    if !args.json {
        let total = run.blocks.len();
        for (i, (block, summary)) in run.blocks.iter().zip(&run.summaries).enumerate() {
            println!("[{}/{}] {}", i + 1, total, short_hash(block.hash()));
            println!("{}\n", summary);
        }
        println!("{} blocks, {} failed", total, run.failed_blocks.len());
    }
    if run.had_error {
        return Err(format!("{} block(s) failed to summarize", run.failed_blocks.len()).into());
    }
    Ok(())
}

async fn prompt(
    orch: &SummaryOrchestrator,
    t: &TranscriptArgs,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let transcript = load_transcript(&t.transcript, t.chat_id.as_deref())?;
    let built = orch.build_prompt(&transcript).await;
    if let Some(msg) = outcome_error(&built.outcome) {
        tracing::warn!("{}; prompt uses cached summaries only", msg);
    }
    let text = built.prompt.text();
    if args.json {
        print_json(
            &serde_json::json!({
                "outcome": built.outcome,
                "remaining_budget": built.prompt.remaining_budget,
                "recent_messages": built.prompt.recent.len(),
                "prompt": text,
            }),
            args.pretty,
        )?;
    } else {
        println!("{}", text);
    }
    Ok(())
}

async fn preview(
    orch: &SummaryOrchestrator,
    p: &PreviewArgs,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let transcript = load_transcript(&p.transcript.transcript, p.transcript.chat_id.as_deref())?;
    let index = usize::try_from(p.block - 1)?;
    let preview = orch.preview(&transcript, index).await?;
    if args.json {
        return print_json(&preview, args.pretty);
    }
    println!(
        "block {}/{}  {}{}",
        preview.index + 1,
        preview.total_blocks,
        preview.hash,
        if preview.cached { "" } else { "  (not cached)" }
    );
    println!("{}", preview.block_text);
    println!("---");
    println!("{}", preview.summary_text);
    Ok(())
}

fn show_settings(
    settings: &Settings,
    resolved: &config::Resolved,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = cache_path(settings).ok();
    if args.json {
        return print_json(
            &serde_json::json!({
                "settings": settings,
                "resolved_cache_path": path,
                "sources": resolved.origins,
            }),
            args.pretty,
        );
    }
    let mut keys: Vec<&String> = resolved.values.keys().collect();
    keys.sort();
    println!("{}", serde_json::to_string_pretty(settings)?);
    if let Some(p) = path {
        println!("cache path: {}", p.display());
    }
    for key in keys {
        if let Some(origin) = resolved.origin(key) {
            println!("{} <- {:?}", key, origin);
        }
    }
    Ok(())
}

async fn run(
    args: &Args,
    settings: Settings,
    resolved: &config::Resolved,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Command::Settings = args.cmd {
        return show_settings(&settings, resolved, args);
    }
    let orch = build_orchestrator(settings)?;
    match &args.cmd {
        Command::Summarize(t) => summarize(&orch, t, args).await,
        Command::Prompt(t) => prompt(&orch, t, args).await,
        Command::Preview(p) => preview(&orch, p, args).await,
        Command::Edit(e) => {
            orch.update_summary(&e.hash, &e.text).await?;
            println!("updated {}", short_hash(&e.hash));
            Ok(())
        }
        Command::Clear => {
            orch.clear_cache().await?;
            println!("cache cleared");
            Ok(())
        }
        Command::Settings => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init()?;

    let result = async {
        let resolved = config::load("recap", KEY_PREFIX, None::<&Path>)?;
        let settings = Settings::from_map(&resolved.values)?;
        run(&args, settings, &resolved).await
    }
    .await;

    if let Err(e) = result {
        eprintln!("recap: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
