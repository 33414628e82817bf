//! Configuration loading and validation.
//!
//! Loads `truth-serum.toml` (or `$TRUTH_SERUM_CONFIG`, or `--config`).
//! Every section uses `#[serde(default)]`, so an empty or missing file is
//! valid. Precedence: env vars > config file > defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;

use crate::targets::{builtin_targets, ProbeTarget};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "TRUTH_SERUM_CONFIG";

/// Config file used when neither `--config` nor the env var is set.
pub const DEFAULT_CONFIG_FILE: &str = "truth-serum.toml";

/// Validation failures for a parsed configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A timeout or window was configured as zero.
    #[error("{0} must be >= 1")]
    ZeroDuration(&'static str),
    /// The target list resolved to nothing.
    #[error("at least one probe target must be configured")]
    NoTargets,
    /// Two targets share a platform id.
    #[error("duplicate platform id: {0}")]
    DuplicatePlatform(String),
    /// A target endpoint path does not start with `/`.
    #[error("endpoint path for {platform} must start with '/': {path}")]
    BadEndpointPath {
        /// Offending platform id.
        platform: String,
        /// Configured path.
        path: String,
    },
    /// A target has an empty id field name.
    #[error("id_field for {0} must not be empty")]
    EmptyIdField(String),
    /// A fake-id pattern is not a valid regular expression.
    #[error("invalid fake_id_pattern {pattern:?}: {source}")]
    BadPattern {
        /// Pattern text as configured.
        pattern: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TruthSerumConfig {
    /// Base URLs and HTTP timing.
    pub endpoints: EndpointsConfig,
    /// Deny-lists and thresholds for the verdict classifier.
    pub classifier: ClassifierConfig,
    /// Output locations.
    pub paths: PathsConfig,
    /// Probe targets; empty means the built-in catalog.
    pub targets: Vec<ProbeTarget>,
}

/// Base URLs and HTTP timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Local sandbox API base.
    pub local_base: String,
    /// Remote (production) API base.
    pub remote_base: String,
    /// Health endpoint path, relative to a base.
    pub health_path: String,
    /// Bound on the local reachability probe, in seconds.
    pub local_probe_timeout_secs: u64,
    /// Per-request timeout for action probes, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            local_base: "http://localhost:3000/api".to_owned(),
            remote_base: "https://studio.contentforge.app/api".to_owned(),
            health_path: "/healthcheck".to_owned(),
            local_probe_timeout_secs: 2,
            request_timeout_secs: 30,
        }
    }
}

/// Classifier deny-lists and thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Maximum allowed skew between an invoice timestamp and capture time.
    pub stale_invoice_secs: u64,
    /// Case-insensitive substrings that mark an id as fabricated.
    pub fake_id_markers: Vec<String>,
    /// Regular expressions matched against the lowercased id.
    pub fake_id_patterns: Vec<String>,
    /// Hosts that never serve real published content.
    pub placeholder_domains: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            stale_invoice_secs: 30,
            fake_id_markers: [
                "mock-",
                "mock_",
                "fake-",
                "fake_",
                "test-",
                "test_",
                "placeholder",
                "dummy",
                "sample-",
                "lorem",
                "simulated",
                "tweet_123",
                "post_123",
            ]
            .iter()
            .map(|s| (*s).to_owned())
            .collect(),
            fake_id_patterns: vec!["^0+$".to_owned(), "^1234567890".to_owned()],
            placeholder_domains: [
                "example.com",
                "example.org",
                "example.net",
                "localhost",
                "127.0.0.1",
                "0.0.0.0",
                "httpbin.org",
                "test.com",
                "fake.com",
                "mock.com",
            ]
            .iter()
            .map(|s| (*s).to_owned())
            .collect(),
        }
    }
}

/// Output locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root for all generated artifacts.
    pub artifacts_dir: PathBuf,
    /// Cache directory wiped by `--clean`.
    pub cache_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("artifacts"),
            cache_dir: PathBuf::from("artifacts/cache"),
        }
    }
}

impl PathsConfig {
    /// Directory holding `<run-id>.json` / `<run-id>.md` reports.
    pub fn reports_dir(&self) -> PathBuf {
        self.artifacts_dir.join("reports")
    }

    /// Directory holding best-effort audit events.
    pub fn events_dir(&self) -> PathBuf {
        self.artifacts_dir.join("council_events")
    }
}

impl TruthSerumConfig {
    /// Load configuration: file (if present), then env overrides, then validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the resulting configuration fails validation.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = Self::config_path_with(explicit, |key| std::env::var(key).ok());
        let mut config = Self::load_from_file(&path, explicit.is_some())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn load_from_file(path: &Path, required: bool) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                tracing::debug!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve the config file path using a custom env resolver.
    pub fn config_path_with(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Some(p) = env(CONFIG_PATH_ENV) {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function so tests never touch the process env.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("TRUTH_SERUM_LOCAL_BASE") {
            self.endpoints.local_base = v;
        }
        if let Some(v) = env("TRUTH_SERUM_REMOTE_BASE") {
            self.endpoints.remote_base = v;
        }
        if let Some(v) = env("TRUTH_SERUM_ARTIFACTS_DIR") {
            let root = PathBuf::from(v);
            self.paths.cache_dir = root.join("cache");
            self.paths.artifacts_dir = root;
        }
        if let Some(v) = env("TRUTH_SERUM_REQUEST_TIMEOUT_SECS") {
            match v.parse() {
                Ok(n) => self.endpoints.request_timeout_secs = n,
                Err(_) => tracing::warn!(
                    var = "TRUTH_SERUM_REQUEST_TIMEOUT_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
    }

    /// Parse a TOML string into config (no env overrides, no validation).
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    /// Targets in effect: the configured list, or the built-in catalog.
    pub fn effective_targets(&self) -> Vec<ProbeTarget> {
        if self.targets.is_empty() {
            builtin_targets()
        } else {
            self.targets.clone()
        }
    }

    /// Check that values are within sane bounds.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.local_probe_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("local_probe_timeout_secs"));
        }
        if self.endpoints.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("request_timeout_secs"));
        }
        if self.classifier.stale_invoice_secs == 0 {
            return Err(ConfigError::ZeroDuration("stale_invoice_secs"));
        }

        let targets = self.effective_targets();
        if targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        let mut seen = HashSet::new();
        for t in &targets {
            if !seen.insert(t.platform_id.to_lowercase()) {
                return Err(ConfigError::DuplicatePlatform(t.platform_id.clone()));
            }
            if !t.endpoint_path.starts_with('/') {
                return Err(ConfigError::BadEndpointPath {
                    platform: t.platform_id.clone(),
                    path: t.endpoint_path.clone(),
                });
            }
            if t.id_field_name.trim().is_empty() {
                return Err(ConfigError::EmptyIdField(t.platform_id.clone()));
            }
        }

        for pattern in &self.classifier.fake_id_patterns {
            regex::Regex::new(pattern).map_err(|source| ConfigError::BadPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
