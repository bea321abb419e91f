use anyhow::Result;
use once_cell::sync::OnceCell;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static TRACING_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Install the global subscriber for the CLI.
///
/// - stderr: human logs.
/// - file: `<log_dir>/<service>.jsonl`, JSON lines, rolled hourly.
/// - env: RUST_LOG controls level (e.g. `info,blockvote_guard=debug`).
///
/// The appender guard must live for the process lifetime, otherwise logs may
/// be dropped.
pub fn init_tracing(service: &str, log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_appender = tracing_appender::rolling::hourly(log_dir, format!("{service}.jsonl"));

    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let _ = TRACING_GUARD.set(guard);

    // stderr keeps stdout clean for the CLI's JSON output
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(false)
        .flatten_event(true)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()?;

    Ok(())
}
