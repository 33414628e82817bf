//! Target resolution: local sandbox or remote deployment.
//!
//! Local detection is a convenience. Any failure falls back to the remote
//! base so a run never silently skips verification.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EndpointsConfig;
use crate::probe::join_url;

/// How the probed base URL was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    /// `--base-url` override.
    Explicit,
    /// `--local` flag.
    ForcedLocal,
    /// `--cloud` flag.
    ForcedRemote,
    /// Local health endpoint answered 2xx.
    DetectedLocal,
    /// Local health endpoint unavailable.
    FallbackRemote,
}

impl TargetSource {
    /// Wire name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::ForcedLocal => "forced_local",
            Self::ForcedRemote => "forced_remote",
            Self::DetectedLocal => "detected_local",
            Self::FallbackRemote => "fallback_remote",
        }
    }
}

impl fmt::Display for TargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved base URL plus how it was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Resolution path taken.
    pub source: TargetSource,
}

/// Decide which base endpoint set to probe.
///
/// Order: explicit override, `prefer_local`, `prefer_remote`, then a bounded
/// reachability check against the local health endpoint.
pub async fn resolve(
    explicit_base: Option<&str>,
    prefer_local: bool,
    prefer_remote: bool,
    endpoints: &EndpointsConfig,
) -> ResolvedTarget {
    let resolved = if let Some(base) = explicit_base {
        ResolvedTarget::new(base, TargetSource::Explicit)
    } else if prefer_local {
        ResolvedTarget::new(&endpoints.local_base, TargetSource::ForcedLocal)
    } else if prefer_remote {
        ResolvedTarget::new(&endpoints.remote_base, TargetSource::ForcedRemote)
    } else if local_available(endpoints).await {
        ResolvedTarget::new(&endpoints.local_base, TargetSource::DetectedLocal)
    } else {
        ResolvedTarget::new(&endpoints.remote_base, TargetSource::FallbackRemote)
    };

    info!(base_url = %resolved.base_url, source = %resolved.source, "target resolved");
    resolved
}

impl ResolvedTarget {
    fn new(base: &str, source: TargetSource) -> Self {
        Self {
            base_url: base.trim_end_matches('/').to_owned(),
            source,
        }
    }
}

/// Probe the local health endpoint; errors count as "unavailable".
async fn local_available(endpoints: &EndpointsConfig) -> bool {
    let url = join_url(&endpoints.local_base, &endpoints.health_path);
    let timeout = Duration::from_secs(endpoints.local_probe_timeout_secs);

    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "could not build local probe client");
            return false;
        }
    };

    match client.get(&url).send().await {
        Ok(r) if r.status().is_success() => true,
        Ok(r) => {
            debug!(%url, status = r.status().as_u16(), "local health non-2xx");
            false
        }
        Err(e) => {
            debug!(%url, error = %e, "local health unreachable");
            false
        }
    }
}
