//! Structured logging setup using `tracing-subscriber` and `tracing-appender`.
//!
//! Two modes:
//! - **Persistent** ([`init_production`]): JSON file layer (daily rotation) + stderr
//! - **CLI** ([`init_cli`]): stderr only
//!
//! Logs always go to stderr so stdout stays reserved for verdict lines and
//! the rendered report.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Holds the non-blocking writer guard for file logging.
///
/// Dropping it flushes pending log entries and closes the file, so keep it
/// alive until the run's reports have been written.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Initialise JSON file logging under `logs_dir` plus stderr output.
///
/// Writes `{logs_dir}/truth-serum.log.YYYY-MM-DD`. Verbosity follows
/// `RUST_LOG` (default: `info`).
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created or a global
/// subscriber is already installed.
pub fn init_production(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create logs directory {}", logs_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "truth-serum.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(default_filter())
        .with(json_layer)
        .with(console_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(LoggingGuard { _guard: guard })
}

/// Initialise stderr-only logging. Controlled by `RUST_LOG` (default: `info`).
pub fn init_cli() {
    // A subscriber may already be installed (e.g. in tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
