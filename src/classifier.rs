//! Verdict classifier: maps one captured response to one verdict.
//!
//! The chain is ordered and the first matching rule wins. Stricter rules sit
//! earlier; later rules assume the earlier ones already excluded
//! contradictory states. Default posture is suspicious, never optimistic.
//!
//! [`classify`] is pure: it reads nothing but its arguments. Rule 1f compares
//! the invoice timestamp against the probe's own capture time, so the same
//! [`ProbeResult`] always yields the same [`Verdict`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ClassifierConfig, ConfigError};
use crate::probe::ProbeResult;
use crate::targets::ProbeTarget;

/// Minimum run of one repeated character that marks an id as filler.
const REPEATED_CHAR_RUN: usize = 10;

/// Epoch values above this are treated as milliseconds.
const EPOCH_MILLIS_THRESHOLD: u64 = 100_000_000_000;

/// How honestly-disabled targets count toward the run outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Disabled targets are reported as `DISABLED` and block the run.
    Strict,
    /// Disabled targets are accepted as `PASS`.
    Lenient,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Lenient => f.write_str("lenient"),
        }
    }
}

/// Terminal judgment on one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictKind {
    /// Claim verified, or an acceptable non-action.
    Pass,
    /// The action did not happen.
    Fail,
    /// The target is honestly unconfigured.
    Disabled,
    /// The target claimed success it cannot back up.
    LiarDetected,
}

impl VerdictKind {
    /// Severity rank (higher = worse): `LIAR_DETECTED > FAIL > DISABLED > PASS`.
    pub fn severity(self) -> u8 {
        match self {
            Self::Pass => 0,
            Self::Disabled => 1,
            Self::Fail => 2,
            Self::LiarDetected => 3,
        }
    }

    /// Wire name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Disabled => "DISABLED",
            Self::LiarDetected => "LIAR_DETECTED",
        }
    }
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the probed system described its own state accurately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Honesty {
    /// Accurately reports its own state.
    Truthful,
    /// Claims something false.
    Dishonest,
    /// Ambiguous; cannot be trusted either way.
    Suspicious,
}

impl fmt::Display for Honesty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truthful => f.write_str("truthful"),
            Self::Dishonest => f.write_str("dishonest"),
            Self::Suspicious => f.write_str("suspicious"),
        }
    }
}

/// Classifier output for exactly one [`ProbeResult`]. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// Platform the verdict is about.
    pub platform_id: String,
    /// Terminal judgment.
    pub verdict_kind: VerdictKind,
    /// Honesty axis.
    pub honesty: Honesty,
    /// Why, most decisive reason first.
    pub reasons: Vec<String>,
    /// The evidence this verdict was derived from.
    pub source_result: ProbeResult,
}

/// Immutable deny-list and thresholds, built once per run.
#[derive(Debug, Clone)]
pub struct DenyList {
    markers: Vec<String>,
    patterns: Vec<Regex>,
    domains: Vec<String>,
    min_id_lengths: BTreeMap<String, usize>,
    stale_after: TimeDelta,
}

impl DenyList {
    /// Build from classifier config and the per-platform id minimums.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BadPattern`] if a fake-id pattern does not compile.
    pub fn from_config(
        config: &ClassifierConfig,
        targets: &[ProbeTarget],
    ) -> Result<Self, ConfigError> {
        let patterns = config
            .fake_id_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| ConfigError::BadPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let secs = i64::try_from(config.stale_invoice_secs).unwrap_or(i64::MAX);
        Ok(Self {
            markers: config
                .fake_id_markers
                .iter()
                .map(|m| m.to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
            patterns,
            domains: config
                .placeholder_domains
                .iter()
                .map(|d| d.trim_start_matches('.').to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            min_id_lengths: targets
                .iter()
                .map(|t| (t.platform_id.clone(), t.min_id_length))
                .collect(),
            stale_after: TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX),
        })
    }

    /// Minimum real-id length for `target`'s platform.
    pub fn min_id_length(&self, target: &ProbeTarget) -> usize {
        self.min_id_lengths
            .get(&target.platform_id)
            .copied()
            .unwrap_or(target.min_id_length)
    }

    /// First deny-list entry the id matches, if any.
    pub fn fake_marker(&self, id: &str) -> Option<String> {
        let lowered = id.to_lowercase();
        if let Some(m) = self.markers.iter().find(|m| lowered.contains(m.as_str())) {
            return Some(m.clone());
        }
        self.patterns
            .iter()
            .find(|p| p.is_match(&lowered))
            .map(|p| format!("/{}/", p.as_str()))
    }

    /// Placeholder domain the host belongs to, if any.
    pub fn placeholder_domain(&self, host: &str) -> Option<&str> {
        let host = host.trim_end_matches('.').to_lowercase();
        self.domains
            .iter()
            .find(|d| host == **d || host.ends_with(&format!(".{d}")))
            .map(String::as_str)
    }
}

/// Classify one probe result.
pub fn classify(
    result: &ProbeResult,
    target: &ProbeTarget,
    mode: RunMode,
    deny: &DenyList,
) -> Verdict {
    let body: Value = serde_json::from_str(&result.raw_body).unwrap_or(Value::Null);
    let success = flag(&body, "success");
    let disabled = flag(&body, "disabled");

    // Rule 0: a payload that is both disabled and successful contradicts itself.
    if disabled == Some(true) && success == Some(true) {
        return verdict(
            result,
            VerdictKind::LiarDetected,
            Honesty::Dishonest,
            vec![
                "self-contradictory response: disabled and success both true".to_owned(),
                format!("HTTP {}", result.http_status),
            ],
        );
    }

    // Rule 1: claimed success must carry proof.
    if result.http_status == 200 && success == Some(true) {
        return classify_claimed_success(result, target, &body, deny);
    }

    // Rule 2: disabled / reported failure.
    if disabled == Some(true) {
        let error = error_text(&body);
        let mut reasons = vec![match mode {
            RunMode::Strict => "target reports it is disabled".to_owned(),
            RunMode::Lenient => "target honestly disabled; accepted in lenient mode".to_owned(),
        }];
        if let Some(e) = error {
            reasons.push(format!("error: {e}"));
        }
        let kind = match mode {
            RunMode::Strict => VerdictKind::Disabled,
            RunMode::Lenient => VerdictKind::Pass,
        };
        return verdict(result, kind, Honesty::Truthful, reasons);
    }
    if success == Some(false) {
        if let Some(e) = error_text(&body) {
            return verdict(
                result,
                VerdictKind::Fail,
                Honesty::Truthful,
                vec![
                    format!("target reported failure: {e}"),
                    format!("HTTP {}", result.http_status),
                ],
            );
        }
    }

    // Rule 3: fall back on the transport/status shape.
    classify_by_status(result)
}

/// Rules 1a-1g: identifier and companion-field checks for a success claim.
fn classify_claimed_success(
    result: &ProbeResult,
    target: &ProbeTarget,
    body: &Value,
    deny: &DenyList,
) -> Verdict {
    let field = &target.id_field_name;
    let liar = |reasons: Vec<String>| {
        verdict(result, VerdictKind::LiarDetected, Honesty::Dishonest, reasons)
    };

    let id = match id_value(body, field) {
        Some(id) => id,
        None => {
            return liar(vec![
                "claims success with no id".to_owned(),
                format!("field '{field}' missing or empty"),
            ]);
        }
    };

    if let Some(marker) = deny.fake_marker(&id) {
        return liar(vec![
            "claims success with a placeholder id".to_owned(),
            format!("{field}={id:?} matches deny-list entry {marker:?}"),
        ]);
    }

    let min_len = deny.min_id_length(target);
    let len = id.chars().count();
    if len < min_len {
        return liar(vec![
            "claims success with an implausibly short id".to_owned(),
            format!(
                "{field}={id:?} has {len} characters, {} ids have at least {min_len}",
                target.display_name
            ),
        ]);
    }

    if is_repeated_filler(&id) {
        return liar(vec![
            "claims success with a filler id".to_owned(),
            format!("{field}={id:?} is a single repeated character"),
        ]);
    }

    if let Some(url_field) = &target.url_field_name {
        match companion_url(body, url_field) {
            CompanionUrl::Absent => {}
            CompanionUrl::Host(host) => {
                if let Some(domain) = deny.placeholder_domain(&host) {
                    return liar(vec![
                        "claims success with a placeholder url".to_owned(),
                        format!("{url_field} host {host:?} is on placeholder domain {domain:?}"),
                    ]);
                }
            }
            CompanionUrl::Unreadable(raw) => {
                return verdict(
                    result,
                    VerdictKind::Fail,
                    Honesty::Suspicious,
                    vec![
                        "companion url has no readable host; claim cannot be checked".to_owned(),
                        format!("{url_field}={raw}"),
                    ],
                );
            }
        }
    }

    if let Some(ts) = body.get("invoice").and_then(|i| i.get("timestamp")) {
        match parse_timestamp(ts) {
            Some(invoice_at) => {
                let skew = result.timestamp.signed_duration_since(invoice_at).abs();
                if skew > deny.stale_after {
                    return verdict(
                        result,
                        VerdictKind::Fail,
                        Honesty::Suspicious,
                        vec![
                            "invoice timestamp is stale; possible cached or replayed response"
                                .to_owned(),
                            format!(
                                "invoice differs from capture time by {}s (limit {}s)",
                                skew.num_seconds(),
                                deny.stale_after.num_seconds()
                            ),
                        ],
                    );
                }
            }
            None => {
                return verdict(
                    result,
                    VerdictKind::Fail,
                    Honesty::Suspicious,
                    vec![
                        "invoice timestamp unreadable; freshness cannot be established".to_owned(),
                        format!("invoice.timestamp={ts}"),
                    ],
                );
            }
        }
    }

    verdict(
        result,
        VerdictKind::Pass,
        Honesty::Truthful,
        vec![format!("success claim backed by {field}={id:?}")],
    )
}

/// Rule 3: status-code fallback for anything the body rules did not match.
fn classify_by_status(result: &ProbeResult) -> Verdict {
    let status = result.http_status;
    let (kind, honesty, reason) = match status {
        0 => (
            VerdictKind::Fail,
            Honesty::Truthful,
            format!("target unreachable: {}", result.raw_body),
        ),
        401 => (
            VerdictKind::Fail,
            Honesty::Truthful,
            "HTTP 401: credentials rejected".to_owned(),
        ),
        429 => (
            VerdictKind::Pass,
            Honesty::Truthful,
            "HTTP 429: rate limited, not deceptive".to_owned(),
        ),
        400 => (
            VerdictKind::Fail,
            Honesty::Truthful,
            "HTTP 400: request rejected".to_owned(),
        ),
        s if s >= 500 => (
            VerdictKind::Fail,
            Honesty::Truthful,
            format!("HTTP {s}: server error"),
        ),
        s => (
            VerdictKind::Fail,
            Honesty::Suspicious,
            format!("unclassifiable response shape (HTTP {s})"),
        ),
    };
    verdict(result, kind, honesty, vec![reason])
}

fn verdict(
    result: &ProbeResult,
    verdict_kind: VerdictKind,
    honesty: Honesty,
    reasons: Vec<String>,
) -> Verdict {
    Verdict {
        platform_id: result.platform_id.clone(),
        verdict_kind,
        honesty,
        reasons,
        source_result: result.clone(),
    }
}

/// A boolean field, only when it is a JSON boolean.
fn flag(body: &Value, key: &str) -> Option<bool> {
    body.get(key).and_then(Value::as_bool)
}

/// Non-empty error text, whether the field is a string or a structured object.
fn error_text(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Object(o) if !o.is_empty() => Some(Value::Object(o.clone()).to_string()),
        _ => None,
    }
}

/// Identifier text; numeric ids are accepted as their decimal form.
fn id_value(body: &Value, field: &str) -> Option<String> {
    let id = match body.get(field)? {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

/// What a success claim's companion URL field holds.
enum CompanionUrl {
    /// Field missing, null, or blank.
    Absent,
    /// Lowercase host the URL points at.
    Host(String),
    /// Present but no host can be read from it (raw JSON value).
    Unreadable(String),
}

/// Read the companion URL host. Scheme-less values such as
/// `example.com/x` or `localhost:3000/x` are read as `https://` URLs.
fn companion_url(body: &Value, field: &str) -> CompanionUrl {
    let raw = match body.get(field) {
        None | Some(Value::Null) => return CompanionUrl::Absent,
        Some(Value::String(s)) => s.trim(),
        Some(other) => return CompanionUrl::Unreadable(other.to_string()),
    };
    if raw.is_empty() {
        return CompanionUrl::Absent;
    }

    let host_of = |text: &str| {
        url::Url::parse(text)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .filter(|h| !h.is_empty())
    };
    match host_of(raw).or_else(|| host_of(&format!("https://{raw}"))) {
        Some(host) => CompanionUrl::Host(host),
        None => CompanionUrl::Unreadable(format!("{raw:?}")),
    }
}

fn is_repeated_filler(id: &str) -> bool {
    let mut chars = id.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    id.chars().count() >= REPEATED_CHAR_RUN && chars.all(|c| c == first)
}

/// Accepts RFC 3339 strings and epoch seconds or milliseconds (number or digit string).
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let epoch = match value {
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s.trim()) {
                return Some(dt.with_timezone(&Utc));
            }
            s.trim().parse::<i64>().ok()?
        }
        Value::Number(n) => n.as_i64()?,
        _ => return None,
    };
    if epoch.unsigned_abs() > EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}
