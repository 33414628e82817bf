//! Run report aggregation and rendering.
//!
//! Reduces verdicts to per-kind counts, picks the headline from the single
//! worst verdict, and renders a lossless JSON document plus a Markdown
//! summary. Persisting is best-effort: a failed write is logged and never
//! alters what the run concluded.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classifier::{Honesty, RunMode, Verdict, VerdictKind};
use crate::exit_code;
use crate::probe::HealthAnnotation;
use crate::resolver::{ResolvedTarget, TargetSource};

/// Per-kind verdict counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Number of verdicts.
    pub total: usize,
    /// `PASS` count.
    pub pass: usize,
    /// `FAIL` count.
    pub fail: usize,
    /// `DISABLED` count.
    pub disabled: usize,
    /// `LIAR_DETECTED` count.
    pub liars: usize,
    /// True iff every verdict is truthful.
    pub all_honest: bool,
}

/// Reduce verdicts to a [`Summary`]. Pure.
pub fn aggregate(verdicts: &[Verdict]) -> Summary {
    let mut summary = Summary {
        total: 0,
        pass: 0,
        fail: 0,
        disabled: 0,
        liars: 0,
        all_honest: true,
    };
    for v in verdicts {
        summary.total = summary.total.saturating_add(1);
        let slot = match v.verdict_kind {
            VerdictKind::Pass => &mut summary.pass,
            VerdictKind::Fail => &mut summary.fail,
            VerdictKind::Disabled => &mut summary.disabled,
            VerdictKind::LiarDetected => &mut summary.liars,
        };
        *slot = slot.saturating_add(1);
        summary.all_honest &= v.honesty == Honesty::Truthful;
    }
    summary
}

/// The most severe verdict kind in the run, if any verdicts exist.
pub fn worst_kind(verdicts: &[Verdict]) -> Option<VerdictKind> {
    verdicts
        .iter()
        .map(|v| v.verdict_kind)
        .max_by_key(|k| k.severity())
}

/// Run headline, chosen by the worst verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Headline {
    /// At least one `LIAR_DETECTED`.
    DishonestyDetected,
    /// Worst verdict is `FAIL`.
    FailuresDetected,
    /// Worst verdict is `DISABLED`.
    TargetsDisabled,
    /// Every verdict is `PASS`.
    AllClaimsVerified,
    /// The run produced no verdicts.
    NoTargetsProbed,
}

impl Headline {
    /// Pick the headline for a set of verdicts.
    pub fn for_verdicts(verdicts: &[Verdict]) -> Self {
        match worst_kind(verdicts) {
            Some(VerdictKind::LiarDetected) => Self::DishonestyDetected,
            Some(VerdictKind::Fail) => Self::FailuresDetected,
            Some(VerdictKind::Disabled) => Self::TargetsDisabled,
            Some(VerdictKind::Pass) => Self::AllClaimsVerified,
            None => Self::NoTargetsProbed,
        }
    }

    /// Banner text.
    pub fn banner(self) -> &'static str {
        match self {
            Self::DishonestyDetected => "DISHONESTY DETECTED",
            Self::FailuresDetected => "FAILURES DETECTED",
            Self::TargetsDisabled => "TARGETS DISABLED",
            Self::AllClaimsVerified => "ALL CLAIMS VERIFIED",
            Self::NoTargetsProbed => "NO TARGETS PROBED",
        }
    }
}

/// Complete record of one audit run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Unique run id.
    pub run_id: String,
    /// When probing started.
    pub started_at: DateTime<Utc>,
    /// When the last verdict was recorded.
    pub finished_at: DateTime<Utc>,
    /// Base URL that was probed.
    pub target_base_url: String,
    /// How the base URL was chosen.
    pub target_source: TargetSource,
    /// Strict or lenient.
    pub mode: RunMode,
    /// Health-endpoint annotation, if one was taken.
    pub preflight: Option<HealthAnnotation>,
    /// One verdict per probed target, in probe order.
    pub verdicts: Vec<Verdict>,
    /// Per-kind counts.
    pub summary: Summary,
    /// Severity-ordered headline.
    pub headline: Headline,
    /// Process exit status the run maps to.
    pub exit_code: u8,
}

/// Inputs describing a finished run.
pub struct RunContext<'a> {
    /// Run id.
    pub run_id: &'a str,
    /// Probe start time.
    pub started_at: DateTime<Utc>,
    /// Resolved base URL.
    pub target: &'a ResolvedTarget,
    /// Strict or lenient.
    pub mode: RunMode,
    /// Pre-flight annotation.
    pub preflight: Option<HealthAnnotation>,
}

impl RunReport {
    /// Assemble the report once all verdicts are in.
    pub fn new(ctx: RunContext<'_>, verdicts: Vec<Verdict>) -> Self {
        let summary = aggregate(&verdicts);
        let headline = Headline::for_verdicts(&verdicts);
        let exit_code = exit_code::translate(&summary, ctx.mode);
        Self {
            run_id: ctx.run_id.to_owned(),
            started_at: ctx.started_at,
            finished_at: Utc::now(),
            target_base_url: ctx.target.base_url.clone(),
            target_source: ctx.target.source,
            mode: ctx.mode,
            preflight: ctx.preflight,
            verdicts,
            summary,
            headline,
            exit_code,
        }
    }

    /// Lossless pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize run report")
    }

    /// Human-readable Markdown with the severity banner first.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;

        let _ = writeln!(out, "# Truth Serum: {}", self.headline.banner());
        let _ = writeln!(out);
        let _ = writeln!(out, "- Run: `{}`", self.run_id);
        let _ = writeln!(out, "- Started: {}", self.started_at.to_rfc3339());
        let _ = writeln!(
            out,
            "- Target: {} ({})",
            self.target_base_url, self.target_source
        );
        let _ = writeln!(out, "- Mode: {}", self.mode);
        if let Some(p) = &self.preflight {
            let status = p.status.as_deref().unwrap_or("unknown");
            if p.reachable {
                let _ = writeln!(
                    out,
                    "- Health: HTTP {} status={status} services={}",
                    p.http_status,
                    p.services.len()
                );
            } else {
                let _ = writeln!(out, "- Health: unreachable");
            }
        }
        let _ = writeln!(out, "- Exit code: {}", self.exit_code);
        let _ = writeln!(out);

        let _ = writeln!(out, "## Summary");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Total | Pass | Fail | Disabled | Liars | All honest |");
        let _ = writeln!(out, "|---|---|---|---|---|---|");
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            s.total,
            s.pass,
            s.fail,
            s.disabled,
            s.liars,
            if s.all_honest { "yes" } else { "no" }
        );
        let _ = writeln!(out);

        let _ = writeln!(out, "## Verdicts");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Platform | Verdict | Honesty | HTTP | Latency | Reasons |");
        let _ = writeln!(out, "|---|---|---|---|---|---|");
        for v in &self.verdicts {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {}ms | {} |",
                v.platform_id,
                v.verdict_kind,
                v.honesty,
                v.source_result.http_status,
                v.source_result.duration_ms,
                md_cell(&v.reasons.join("; ")),
            );
        }
        out
    }
}

/// Where report files landed. `None` means that write failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportPaths {
    /// `<run-id>.json`
    pub json: Option<PathBuf>,
    /// `<run-id>.md`
    pub markdown: Option<PathBuf>,
}

/// Write both report files. Each write is attempted independently.
pub async fn write_reports(report: &RunReport, dir: &Path) -> ReportPaths {
    let json_path = dir.join(format!("{}.json", report.run_id));
    let md_path = dir.join(format!("{}.md", report.run_id));

    let json = match report.to_json() {
        Ok(text) => write_logged(&json_path, &text).await,
        Err(e) => {
            warn!(error = %e, "run report not serializable");
            None
        }
    };
    let markdown = write_logged(&md_path, &report.to_markdown()).await;

    ReportPaths { json, markdown }
}

async fn write_logged(path: &Path, contents: &str) -> Option<PathBuf> {
    match write_atomic(path, contents).await {
        Ok(()) => {
            debug!(path = %path.display(), "report written");
            Some(path.to_path_buf())
        }
        Err(e) => {
            warn!(path = %path.display(), error = %format!("{e:#}"), "failed to write report");
            None
        }
    }
}

/// Write to a temp sibling then rename, so readers never see a partial file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the write fails.
pub async fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    tokio::fs::write(&tmp_path, contents.as_bytes())
        .await
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("failed to rename into {}", path.display()))?;
    Ok(())
}

fn md_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
