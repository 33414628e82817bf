//! Probe target catalog.
//!
//! A [`ProbeTarget`] names one monitored action endpoint and the response
//! fields that must carry proof that the action really happened. The built-in
//! catalog covers every platform the content pipeline posts to; a config file
//! may replace it wholesale.

use serde::{Deserialize, Serialize};

/// Minimum id length assumed for platforms that do not declare one.
pub const DEFAULT_MIN_ID_LENGTH: usize = 6;

/// Static description of one monitored action endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTarget {
    /// Stable platform identifier (e.g. "twitter").
    pub platform_id: String,
    /// Path appended to the resolved base URL, starting with `/`.
    pub endpoint_path: String,
    /// Response field holding the proof-of-work identifier.
    #[serde(rename = "id_field")]
    pub id_field_name: String,
    /// Optional response field holding a public URL for the created item.
    #[serde(rename = "url_field", default)]
    pub url_field_name: Option<String>,
    /// Human-readable platform name.
    pub display_name: String,
    /// Shortest identifier this platform is known to issue.
    #[serde(default = "default_min_id_length")]
    pub min_id_length: usize,
    /// Whether this target is part of the default (non `--all-platforms`) subset.
    #[serde(default)]
    pub default_enabled: bool,
}

impl ProbeTarget {
    fn builtin(
        platform_id: &str,
        id_field: &str,
        url_field: &str,
        display_name: &str,
        min_id_length: usize,
        default_enabled: bool,
    ) -> Self {
        Self {
            platform_id: platform_id.to_owned(),
            endpoint_path: format!("/{platform_id}"),
            id_field_name: id_field.to_owned(),
            url_field_name: Some(url_field.to_owned()),
            display_name: display_name.to_owned(),
            min_id_length,
            default_enabled,
        }
    }
}

/// The built-in target catalog.
///
/// Twitter ids are snowflakes (15+ digits), YouTube video ids are exactly
/// 11 characters, Reddit base36 ids are short but never below 5.
pub fn builtin_targets() -> Vec<ProbeTarget> {
    vec![
        ProbeTarget::builtin("twitter", "tweetId", "tweetUrl", "Twitter / X", 15, true),
        ProbeTarget::builtin("linkedin", "postId", "postUrl", "LinkedIn", 10, true),
        ProbeTarget::builtin("facebook", "postId", "postUrl", "Facebook", 10, true),
        ProbeTarget::builtin("instagram", "mediaId", "permalink", "Instagram", 10, false),
        ProbeTarget::builtin("youtube", "videoId", "videoUrl", "YouTube", 11, false),
        ProbeTarget::builtin("tiktok", "videoId", "shareUrl", "TikTok", 15, false),
        ProbeTarget::builtin("reddit", "postId", "postUrl", "Reddit", 5, false),
        ProbeTarget::builtin("mastodon", "statusId", "statusUrl", "Mastodon", 15, false),
        ProbeTarget::builtin("bluesky", "uri", "postUrl", "Bluesky", 20, false),
        ProbeTarget::builtin("threads", "postId", "postUrl", "Threads", 10, false),
    ]
}

/// Pick the targets to probe for one run.
///
/// An explicit `only` list wins and keeps catalog order. Otherwise every
/// target is returned when `all` is set, else the default subset.
pub fn select<'a>(catalog: &'a [ProbeTarget], all: bool, only: &[String]) -> Vec<&'a ProbeTarget> {
    if !only.is_empty() {
        return catalog
            .iter()
            .filter(|t| only.iter().any(|id| id.eq_ignore_ascii_case(&t.platform_id)))
            .collect();
    }
    catalog
        .iter()
        .filter(|t| all || t.default_enabled)
        .collect()
}

fn default_min_id_length() -> usize {
    DEFAULT_MIN_ID_LENGTH
}
