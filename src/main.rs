//! Truth Serum CLI entry point.
//!
//! Runs one audit against every selected target and exits with the run's
//! severity: 0 all verified, 1 failures (or disabled targets in strict mode),
//! 2 dishonesty detected.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, warn};

use truth_serum::classifier::RunMode;
use truth_serum::config::TruthSerumConfig;
use truth_serum::exit_code::EXIT_FAILURE;
use truth_serum::logging;
use truth_serum::run::{self, RunOptions};

/// Truth Serum: audit success claims of side-effecting actions.
#[derive(Parser, Debug)]
#[command(name = "truth-serum", version, about)]
struct Cli {
    /// Accept honestly disabled targets as passing (lenient mode).
    #[arg(long)]
    allow_disabled: bool,

    /// Probe the local sandbox without a reachability check.
    #[arg(long, conflicts_with_all = ["cloud", "base_url"])]
    local: bool,

    /// Probe the remote deployment without a reachability check.
    #[arg(long, conflicts_with = "base_url")]
    cloud: bool,

    /// Probe this base URL instead of resolving one.
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Wipe the external cache directory before the run.
    #[arg(long)]
    clean: bool,

    /// Probe every configured target instead of the default subset.
    #[arg(long)]
    all_platforms: bool,

    /// Probe only this platform id (repeatable).
    #[arg(long = "platform", value_name = "ID")]
    platforms: Vec<String>,

    /// Config file (default: `$TRUTH_SERUM_CONFIG` or `./truth-serum.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Root directory for reports and audit events.
    #[arg(long, value_name = "PATH")]
    artifacts_dir: Option<PathBuf>,

    /// Also write JSON logs with daily rotation to this directory.
    #[arg(long, value_name = "PATH")]
    log_dir: Option<PathBuf>,

    /// Print the JSON report instead of Markdown.
    #[arg(long)]
    json: bool,

    /// Recorded as `triggeredBy` in the audit event.
    #[arg(long, default_value = "truth-serum")]
    triggered_by: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // clap exits 2 on usage errors; 2 is reserved for dishonesty.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return Ok(if e.use_stderr() {
                ExitCode::from(EXIT_FAILURE)
            } else {
                ExitCode::SUCCESS
            });
        }
    };
    let dotenv = dotenvy::dotenv();

    let _logging_guard = match &cli.log_dir {
        Some(dir) => Some(logging::init_production(dir)?),
        None => {
            logging::init_cli();
            None
        }
    };

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "ignoring unreadable .env"),
    }

    let mut config = TruthSerumConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.artifacts_dir {
        config.paths.cache_dir = dir.join("cache");
        config.paths.artifacts_dir = dir.clone();
    }

    if cli.clean {
        if let Err(e) = run::wipe_cache(&config.paths.cache_dir).await {
            warn!(error = %format!("{e:#}"), "cache wipe failed, continuing");
        }
    }

    let options = RunOptions {
        explicit_base: cli.base_url,
        prefer_local: cli.local,
        prefer_remote: cli.cloud,
        mode: if cli.allow_disabled {
            RunMode::Lenient
        } else {
            RunMode::Strict
        },
        all_platforms: cli.all_platforms,
        platforms: cli.platforms,
        triggered_by: cli.triggered_by,
    };

    // Under --json stdout carries only the report document.
    let mut stdout = std::io::stdout();
    let outcome = if cli.json {
        run::execute(&config, &options, &mut std::io::stderr()).await?
    } else {
        run::execute(&config, &options, &mut stdout).await?
    };

    let rendered = if cli.json {
        outcome.report.to_json()?
    } else {
        outcome.report.to_markdown()
    };
    if !cli.json {
        println!();
    }
    println!("{rendered}");

    if outcome.paths.json.is_none() || outcome.paths.markdown.is_none() {
        warn!("one or more report files could not be written; verdict unaffected");
    }
    if let Some(path) = &outcome.paths.json {
        debug!(path = %path.display(), "json report");
    }

    let code = outcome.report.exit_code;
    std::io::Write::flush(&mut stdout).context("failed to flush stdout")?;
    Ok(ExitCode::from(code))
}
