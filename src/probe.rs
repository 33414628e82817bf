//! Probe runner: one deterministic POST per monitored action.
//!
//! A probe never retries. Transport failures are folded into a
//! [`ProbeResult`] with `http_status == 0` so the classifier can tell
//! "service down" apart from "service lied".

use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::targets::ProbeTarget;

/// Status recorded when no HTTP response was received.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

/// User id stamped on every probe request.
pub const PROBE_USER_ID: &str = "truth-serum-auditor";

/// Why a probe never produced an HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete within the client timeout.
    #[error("transport error (timeout): {0}")]
    Timeout(String),
    /// Connection refused, reset, or name resolution failed.
    #[error("transport error (connect): target unreachable: {0}")]
    Connect(String),
    /// Any other failure while building or sending the request.
    #[error("transport error (request): {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let detail = error_chain(&e);
        if e.is_timeout() {
            Self::Timeout(detail)
        } else if e.is_connect() {
            Self::Connect(detail)
        } else {
            Self::Request(detail)
        }
    }
}

/// Raw outcome of a single probe. Immutable once captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    /// Platform the probe was sent for.
    pub platform_id: String,
    /// HTTP status, or [`TRANSPORT_FAILURE_STATUS`] when nothing came back.
    pub http_status: u16,
    /// Wall-clock latency of the request.
    pub duration_ms: u64,
    /// Response body as received, or a transport error description.
    pub raw_body: String,
    /// Capture time.
    pub timestamp: DateTime<Utc>,
}

impl ProbeResult {
    /// Build the synthetic result for a probe that got no HTTP response.
    pub fn transport_failure(
        platform_id: &str,
        error: &TransportError,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            platform_id: platform_id.to_owned(),
            http_status: TRANSPORT_FAILURE_STATUS,
            duration_ms,
            raw_body: error.to_string(),
            timestamp,
        }
    }

    /// Whether this result records a transport failure.
    pub fn is_transport_failure(&self) -> bool {
        self.http_status == TRANSPORT_FAILURE_STATUS
    }
}

/// Fixed request body shared by every probe in a run.
///
/// Content is constant apart from the run id and issue time, so replays of
/// an old response are detectable across runs.
#[derive(Debug, Clone)]
pub struct DeterministicPayload {
    run_id: String,
    issued_at: DateTime<Utc>,
}

impl DeterministicPayload {
    /// Create the payload for one run.
    pub fn new(run_id: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            issued_at,
        }
    }

    /// Run id embedded in the payload.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Request body for one target.
    pub fn body_for(&self, target: &ProbeTarget) -> serde_json::Value {
        let text = format!(
            "Truth Serum integrity probe. Run {} issued {}. Verification only.",
            self.run_id,
            self.issued_at.to_rfc3339(),
        );
        serde_json::json!({
            "text": text,
            "userId": PROBE_USER_ID,
            "platform": target.platform_id,
            "projectId": format!("truth-serum-{}", self.run_id),
            "content": { "text": text },
        })
    }
}

/// Health-endpoint annotation captured before probing. Never part of a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthAnnotation {
    /// Whether any HTTP response came back.
    pub reachable: bool,
    /// HTTP status, 0 when unreachable.
    pub http_status: u16,
    /// Reported `status` field, if the body had one.
    pub status: Option<String>,
    /// Reported `services` array, verbatim.
    #[serde(default)]
    pub services: Vec<serde_json::Value>,
    /// Transport error description when unreachable.
    pub error: Option<String>,
}

/// Sends probes over a shared HTTP client.
pub struct ProbeRunner {
    client: reqwest::Client,
}

impl ProbeRunner {
    /// Create a runner whose only bound on each request is `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("truth-serum/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Send exactly one POST for `target` and capture the outcome.
    pub async fn run_probe(
        &self,
        base_url: &str,
        target: &ProbeTarget,
        payload: &DeterministicPayload,
    ) -> ProbeResult {
        let url = join_url(base_url, &target.endpoint_path);
        let body = payload.body_for(target);
        debug!(platform = %target.platform_id, %url, "sending probe");

        let started = Instant::now();
        let sent = self.client.post(&url).json(&body).send().await;

        let response = match sent {
            Ok(r) => r,
            Err(e) => {
                let error = TransportError::from(e);
                warn!(platform = %target.platform_id, error = %error, "probe transport failure");
                return ProbeResult::transport_failure(
                    &target.platform_id,
                    &error,
                    elapsed_ms(started),
                    Utc::now(),
                );
            }
        };

        let http_status = response.status().as_u16();
        let raw_body = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(platform = %target.platform_id, error = %e, "failed to read probe body");
                format!("<body unreadable: {}>", error_chain(&e))
            }
        };

        ProbeResult {
            platform_id: target.platform_id.clone(),
            http_status,
            duration_ms: elapsed_ms(started),
            raw_body,
            timestamp: Utc::now(),
        }
    }

    /// Fetch the health endpoint as a pre-flight annotation.
    pub async fn preflight(&self, base_url: &str, health_path: &str) -> HealthAnnotation {
        let url = join_url(base_url, health_path);
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                let error = TransportError::from(e);
                debug!(%url, error = %error, "health pre-flight unreachable");
                return HealthAnnotation {
                    reachable: false,
                    http_status: TRANSPORT_FAILURE_STATUS,
                    status: None,
                    services: Vec::new(),
                    error: Some(error.to_string()),
                };
            }
        };

        let http_status = response.status().as_u16();
        let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
        HealthAnnotation {
            reachable: true,
            http_status,
            status: body
                .get("status")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned),
            services: body
                .get("services")
                .and_then(serde_json::Value::as_array)
                .cloned()
                .unwrap_or_default(),
            error: None,
        }
    }
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Flatten an error and its sources into one line.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        out.push_str(": ");
        out.push_str(&s.to_string());
        source = s.source();
    }
    out
}
