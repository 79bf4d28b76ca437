//! Library-side settings and their defaults.
//!
//! [`Settings`] is what the command surface and the CLI read when a request
//! leaves an option out. Loading it from disk is the binary's job.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::{BatchOptions, DEFAULT_CONTAINER, DEFAULT_REQUEST_INTERVAL, FailurePolicy};
use crate::download::{ConflictPolicy, DispatchMode};
use crate::resolver::{DEFAULT_BASE_URL, ResolverHttpTimeouts};

/// Resolution labels the site offers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    /// 360p
    #[default]
    #[serde(rename = "360p")]
    P360,
    /// 480p
    #[serde(rename = "480p")]
    P480,
    /// 720p
    #[serde(rename = "720p")]
    P720,
    /// 1080p
    #[serde(rename = "1080p")]
    P1080,
}

impl Quality {
    /// Every label, lowest first.
    pub const ALL: [Self; 4] = [Self::P360, Self::P480, Self::P720, Self::P1080];

    /// Returns the wire label, e.g. `720p`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::P360 => "360p",
            Self::P480 => "480p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|quality| quality.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                format!("unknown quality '{value}' (expected one of 360p, 480p, 720p, 1080p)")
            })
    }
}

/// Defaults applied to batches and command handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Quality to download.
    pub quality: Quality,
    /// Site mirror root.
    pub base_url: String,
    /// Dispatch mode.
    pub mode: DispatchMode,
    /// Delay between episodes.
    pub request_interval: Duration,
    /// Root directory for local downloads.
    pub output_dir: PathBuf,
    /// Folder created under `output_dir` for each batch.
    pub container: String,
    /// Resolver request timeouts.
    pub resolver_timeouts: ResolverHttpTimeouts,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            mode: DispatchMode::default(),
            request_interval: DEFAULT_REQUEST_INTERVAL,
            output_dir: PathBuf::from("."),
            container: DEFAULT_CONTAINER.to_string(),
            resolver_timeouts: ResolverHttpTimeouts::default(),
        }
    }
}

impl Settings {
    /// Builds batch options for `name` from these settings.
    #[must_use]
    pub fn batch_options(&self, name: impl Into<String>) -> BatchOptions {
        BatchOptions {
            name: name.into(),
            quality: self.quality.as_str().to_string(),
            base_url: self.base_url.clone(),
            mode: self.mode,
            request_interval: self.request_interval,
            container: self.container.clone(),
            conflict_policy: ConflictPolicy::Uniquify,
            failure_policy: FailurePolicy::FailFast,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_parse_and_display() {
        assert_eq!("720p".parse::<Quality>().unwrap(), Quality::P720);
        assert_eq!(" 1080P ".parse::<Quality>().unwrap(), Quality::P1080);
        assert!("4k".parse::<Quality>().is_err());
        assert_eq!(Quality::P480.to_string(), "480p");
    }

    #[test]
    fn test_quality_serde_labels() {
        assert_eq!(serde_json::to_string(&Quality::P360).unwrap(), "\"360p\"");
        let parsed: Quality = serde_json::from_str("\"1080p\"").unwrap();
        assert_eq!(parsed, Quality::P1080);
    }

    #[test]
    fn test_batch_options_from_settings() {
        let settings = Settings {
            quality: Quality::P720,
            mode: DispatchMode::External,
            ..Settings::default()
        };
        let options = settings.batch_options("Show");
        assert_eq!(options.name, "Show");
        assert_eq!(options.quality, "720p");
        assert_eq!(options.mode, DispatchMode::External);
        assert_eq!(options.base_url, "https://9anime.to");
        assert_eq!(options.container, "9anime Companion");
    }
}
