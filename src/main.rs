//! lightcue - Main entry point.
//!
//! Invoked by the audio receiver's hook mechanism, once per session
//! lifecycle event. Always exits 0: lighting control must never disrupt
//! the audio path, so every failure is absorbed and logged instead of
//! being signalled through the exit code.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lightcue::ledfx::LedFxClient;
use lightcue::policy::{ApplierSettings, PolicyStore, optional_env};
use lightcue::{EventKind, HookOrchestrator, LifecycleEvent};

#[derive(Parser)]
#[command(name = "lightcue", version, about = "Session hook for visualization targets")]
struct Cli {
    /// Path to the policy store (default: ~/.lightcue/hooks.yaml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// A stream became active.
    Start {
        /// Free-text context from the receiver (logged verbatim).
        #[arg(long)]
        note: Option<String>,
    },
    /// A stream became inactive.
    Stop {
        /// Free-text context from the receiver (logged verbatim).
        #[arg(long)]
        note: Option<String>,
    },
}

/// Initialize tracing, appending to the hook log file when possible and
/// falling back to stderr otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_path = optional_env("LIGHTCUE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(default_log_path);

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            tracing::warn!(
                path = %log_path.display(),
                "Cannot open hook log, logging to stderr: {e}"
            );
        }
    }
}

/// Default hook log path (`~/.lightcue/hook.log`).
fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lightcue")
        .join("hook.log")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _ = dotenvy::dotenv();
    init_tracing();

    let (kind, note) = match cli.command {
        Command::Start { note } => (EventKind::Start, note),
        Command::Stop { note } => (EventKind::End, note),
    };
    let event = LifecycleEvent::now(kind, note);

    let store = match cli.config {
        Some(path) => PolicyStore::at(path),
        None => PolicyStore::from_env(),
    };

    // One load up front for the connection settings; the orchestrator
    // re-reads the policy itself at the start of its invocation.
    let connection = store.load().connection;
    let settings = ApplierSettings::from_env();

    let client = match LedFxClient::new(&connection, settings.call_timeout) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Cannot build control API client: {e}");
            return Ok(());
        }
    };

    let orchestrator = HookOrchestrator::new(store, Arc::new(client), settings);
    let summary = orchestrator.run(&event).await;

    if summary.failed() > 0 {
        tracing::warn!(
            failed = summary.failed(),
            succeeded = summary.succeeded(),
            "Hook completed with failures"
        );
    }

    Ok(())
}
