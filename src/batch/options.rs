//! Batch inputs: the episode queue and per-run options.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::BatchError;
use crate::download::{ConflictPolicy, DispatchMode};
use crate::resolver::{DEFAULT_BASE_URL, string_or_number};

/// Quality requested when none is given.
pub const DEFAULT_QUALITY: &str = "360p";

/// Interval between episodes when none is given.
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(5000);

/// Folder that local downloads are grouped under.
pub const DEFAULT_CONTAINER: &str = "9anime Companion";

/// Display number of an episode, kept exactly as the caller sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EpisodeNumber {
    /// Sent as a JSON string, e.g. `"12.5"`.
    Text(String),
    /// Sent as a JSON number.
    Number(serde_json::Number),
}

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<u64> for EpisodeNumber {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for EpisodeNumber {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One queued episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRequest {
    /// Opaque upstream id.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Display number used in titles.
    pub number: EpisodeNumber,
}

impl EpisodeRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(id: impl Into<String>, number: impl Into<EpisodeNumber>) -> Self {
        Self {
            id: id.into(),
            number: number.into(),
        }
    }
}

/// Parses a JSON episode list.
///
/// # Errors
///
/// Returns [`BatchError::InvalidInput`] if `value` is not an array, or an
/// entry lacks a string/number `id` or `number`.
pub fn parse_episodes(value: &Value) -> Result<Vec<EpisodeRequest>, BatchError> {
    let Value::Array(entries) = value else {
        return Err(BatchError::invalid_input(format!(
            "episodes must be an array, got {}",
            json_kind(value)
        )));
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            EpisodeRequest::deserialize(entry)
                .map_err(|e| BatchError::invalid_input(format!("episode at index {index}: {e}")))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// What a batch does when one episode fails upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the whole batch on the first failure.
    #[default]
    FailFast,
    /// Record the episode as skipped and continue with the next one.
    SkipFailed,
}

/// Per-run options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Anime name used in titles and filenames (sanitized before use).
    pub name: String,
    /// Exact quality label to keep, e.g. `720p`.
    pub quality: String,
    /// Site root for the metadata endpoint.
    pub base_url: String,
    /// Where matched files go.
    pub mode: DispatchMode,
    /// Delay after each episode before the next one starts.
    pub request_interval: Duration,
    /// Folder prefix for local destinations.
    pub container: String,
    /// Conflict handling passed to the download manager.
    pub conflict_policy: ConflictPolicy,
    /// Reaction to upstream failures.
    pub failure_policy: FailurePolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            quality: DEFAULT_QUALITY.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            mode: DispatchMode::Local,
            request_interval: DEFAULT_REQUEST_INTERVAL,
            container: DEFAULT_CONTAINER.to_string(),
            conflict_policy: ConflictPolicy::Uniquify,
            failure_policy: FailurePolicy::FailFast,
        }
    }
}

impl BatchOptions {
    /// Creates default options for `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the quality label.
    #[must_use]
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    /// Sets the site root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the dispatch mode.
    #[must_use]
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the throttle interval.
    #[must_use]
    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    /// Sets the local container folder.
    #[must_use]
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}
