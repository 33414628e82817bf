//! Audit event emitted for the council event log.
//!
//! The write is fire-and-forget: [`emit_best_effort`] logs a failure and
//! returns `None`, and nothing it does can reach the run's verdicts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::classifier::VerdictKind;
use crate::report::{worst_kind, write_atomic, RunReport};

/// Audit event type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    /// A completed response-integrity run.
    IntegrityAudit,
}

/// Write-once record of a run, for an external event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Unique event id.
    pub event_id: Uuid,
    /// Event type.
    pub kind: AuditEventKind,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Who or what started the run.
    pub triggered_by: String,
    /// Worst verdict in the run; `None` for an empty run.
    pub verdict_kind: Option<VerdictKind>,
    /// One-line human summary.
    pub summary_text: String,
    /// Verdict per platform.
    pub per_target_summary: BTreeMap<String, VerdictKind>,
    /// Path of the JSON report, if it was written.
    pub report_path: Option<PathBuf>,
}

impl AuditEvent {
    /// Build the event for a finished report.
    pub fn from_report(report: &RunReport, triggered_by: &str, report_path: Option<&Path>) -> Self {
        let s = &report.summary;
        Self {
            event_id: Uuid::new_v4(),
            kind: AuditEventKind::IntegrityAudit,
            timestamp: Utc::now(),
            triggered_by: triggered_by.to_owned(),
            verdict_kind: worst_kind(&report.verdicts),
            summary_text: format!(
                "{}: {} targets, {} pass, {} fail, {} disabled, {} liars",
                report.headline.banner(),
                s.total,
                s.pass,
                s.fail,
                s.disabled,
                s.liars,
            ),
            per_target_summary: report
                .verdicts
                .iter()
                .map(|v| (v.platform_id.clone(), v.verdict_kind))
                .collect(),
            report_path: report_path.map(Path::to_path_buf),
        }
    }
}

/// Write `<dir>/<run-id>.json`, swallowing and logging any failure.
pub async fn emit_best_effort(event: &AuditEvent, dir: &Path, run_id: &str) -> Option<PathBuf> {
    let path = dir.join(format!("{run_id}.json"));
    let json = match serde_json::to_string_pretty(event) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "audit event not serializable, skipping");
            return None;
        }
    };
    match write_atomic(&path, &json).await {
        Ok(()) => {
            info!(path = %path.display(), event_id = %event.event_id, "audit event written");
            Some(path)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %format!("{e:#}"), "audit event write failed (ignored)");
            None
        }
    }
}
