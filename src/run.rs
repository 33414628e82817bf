//! One audit run, end to end.
//!
//! Resolver -> probe -> classify -> aggregate -> persist, strictly in that
//! order and one target at a time. Each probe is awaited before the next
//! starts, so invoice timestamps are compared against an unshared clock and
//! the live verdict lines come out in catalog order.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{emit_best_effort, AuditEvent};
use crate::classifier::{classify, DenyList, RunMode, Verdict};
use crate::config::TruthSerumConfig;
use crate::probe::{DeterministicPayload, ProbeRunner};
use crate::report::{write_reports, ReportPaths, RunContext, RunReport};
use crate::resolver::resolve;
use crate::targets::{select, ProbeTarget};

/// Per-invocation choices, normally taken from the CLI.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Explicit base URL override.
    pub explicit_base: Option<String>,
    /// Force the local base.
    pub prefer_local: bool,
    /// Force the remote base.
    pub prefer_remote: bool,
    /// Strict or lenient.
    pub mode: RunMode,
    /// Probe the whole catalog instead of the default subset.
    pub all_platforms: bool,
    /// Restrict to these platform ids.
    pub platforms: Vec<String>,
    /// Recorded in the audit event.
    pub triggered_by: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            explicit_base: None,
            prefer_local: false,
            prefer_remote: false,
            mode: RunMode::Strict,
            all_platforms: false,
            platforms: Vec::new(),
            triggered_by: "truth-serum".to_owned(),
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// The aggregated report.
    pub report: RunReport,
    /// Report files that were written.
    pub paths: ReportPaths,
    /// Audit event file, if the best-effort write succeeded.
    pub event_path: Option<PathBuf>,
}

/// Execute a full audit run, writing one live verdict line per target to `live`.
///
/// # Errors
///
/// Fails only before probing starts: bad deny-list config, an empty target
/// selection, or an HTTP client that cannot be built. Once probing begins
/// every outcome, including write failures, ends up in the report.
pub async fn execute(
    config: &TruthSerumConfig,
    options: &RunOptions,
    live: &mut dyn Write,
) -> anyhow::Result<RunOutcome> {
    let catalog = config.effective_targets();
    let deny = DenyList::from_config(&config.classifier, &catalog)
        .context("invalid classifier deny-list")?;

    let selected = select(&catalog, options.all_platforms, &options.platforms);
    anyhow::ensure!(
        !selected.is_empty(),
        "no configured target matches --platform {:?}",
        options.platforms
    );

    let resolved = resolve(
        options.explicit_base.as_deref(),
        options.prefer_local,
        options.prefer_remote,
        &config.endpoints,
    )
    .await;

    let runner = ProbeRunner::new(std::time::Duration::from_secs(
        config.endpoints.request_timeout_secs,
    ))?;

    let started_at = Utc::now();
    let run_id = new_run_id(started_at);
    info!(
        run_id = %run_id,
        base_url = %resolved.base_url,
        mode = %options.mode,
        targets = selected.len(),
        "audit run started"
    );

    let preflight = runner
        .preflight(&resolved.base_url, &config.endpoints.health_path)
        .await;
    if !preflight.reachable || !(200..300).contains(&preflight.http_status) {
        warn!(
            http_status = preflight.http_status,
            "health pre-flight did not report healthy (annotation only)"
        );
    }

    let payload = DeterministicPayload::new(run_id.clone(), started_at);
    let mut verdicts: Vec<Verdict> = Vec::with_capacity(selected.len());
    for target in selected {
        let result = runner.run_probe(&resolved.base_url, target, &payload).await;
        let verdict = classify(&result, target, options.mode, &deny);
        print_live_line(live, target, &verdict);
        info!(
            platform = %verdict.platform_id,
            verdict = %verdict.verdict_kind,
            honesty = %verdict.honesty,
            http_status = result.http_status,
            duration_ms = result.duration_ms,
            "probe classified"
        );
        verdicts.push(verdict);
    }

    let report = RunReport::new(
        RunContext {
            run_id: &run_id,
            started_at,
            target: &resolved,
            mode: options.mode,
            preflight: Some(preflight),
        },
        verdicts,
    );

    let paths = write_reports(&report, &config.paths.reports_dir()).await;

    let event = AuditEvent::from_report(&report, &options.triggered_by, paths.json.as_deref());
    let event_path = emit_best_effort(&event, &config.paths.events_dir(), &run_id).await;

    info!(
        run_id = %run_id,
        headline = report.headline.banner(),
        exit_code = report.exit_code,
        "audit run finished"
    );

    Ok(RunOutcome {
        report,
        paths,
        event_path,
    })
}

/// Remove the external cache directory. Returns whether anything was removed.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be removed.
pub async fn wipe_cache(dir: &Path) -> anyhow::Result<bool> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            info!(dir = %dir.display(), "cache wiped");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("failed to wipe cache {}", dir.display())),
    }
}

/// `YYYYMMDDTHHMMSSZ-xxxxxxxx`: sortable by time, unique per run.
fn new_run_id(started_at: chrono::DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("{}-{suffix}", started_at.format("%Y%m%dT%H%M%SZ"))
}

fn print_live_line(live: &mut dyn Write, target: &ProbeTarget, verdict: &Verdict) {
    let reason = verdict.reasons.first().map(String::as_str).unwrap_or("");
    let line = writeln!(
        live,
        "[{}] {} ({}): HTTP {} in {}ms, {}: {}",
        verdict.verdict_kind,
        target.platform_id,
        target.display_name,
        verdict.source_result.http_status,
        verdict.source_result.duration_ms,
        verdict.honesty,
        reason,
    );
    if let Err(e) = line {
        warn!(error = %e, "failed to print live verdict line");
    }
}
