//! Pinned-anime list.
//!
//! Pins are keyed by URL and kept in insertion order. [`SqlitePinStore`]
//! persists them; [`MemoryPinStore`] backs tests and ephemeral runs.

mod error;
mod memory;
mod repository;

pub use error::{PinDbErrorKind, PinError};
pub use memory::MemoryPinStore;
pub use repository::SqlitePinStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

/// One pinned anime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedAnime {
    /// Display name.
    pub name: String,
    /// Anime page URL; unique within the list.
    pub url: String,
}

impl PinnedAnime {
    /// Validates and creates a pin.
    ///
    /// # Errors
    ///
    /// Returns [`PinError::Invalid`] for an empty name or a non-http(s) URL.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self, PinError> {
        let name = name.into();
        let url = url.into();
        if name.trim().is_empty() {
            return Err(PinError::invalid("anime name is empty"));
        }
        if !is_http_url(&url) {
            return Err(PinError::invalid(format!("'{url}' is not an http(s) URL")));
        }
        Ok(Self { name, url })
    }
}

/// Result of an add or remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinStatus {
    /// Pin was added.
    Added,
    /// A pin with the same URL already existed; nothing changed.
    Duplicate,
    /// Pin was removed.
    Removed,
    /// No pin had that URL; nothing changed.
    NotFound,
}

impl PinStatus {
    /// Returns the message-surface result string.
    #[must_use]
    pub fn as_result(self) -> &'static str {
        match self {
            Self::Added | Self::Removed => "success",
            Self::Duplicate => "duplicate",
            Self::NotFound => "notFound",
        }
    }
}

/// Outcome of an add or remove, with the list size afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinChange {
    /// What happened.
    pub status: PinStatus,
    /// Number of pins after the operation.
    pub item_count: usize,
}

/// Storage for the pinned list.
#[async_trait]
pub trait PinStore: Send + Sync {
    /// Adds a pin unless its URL is already pinned.
    async fn add(&self, pin: PinnedAnime) -> Result<PinChange, PinError>;

    /// Removes the pin with `url`, if any.
    async fn remove(&self, url: &str) -> Result<PinChange, PinError>;

    /// Lists pins in insertion order.
    async fn list(&self) -> Result<Vec<PinnedAnime>, PinError>;
}

/// Returns true for absolute http or https URLs with a host.
#[must_use]
pub fn is_http_url(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://9anime.to/watch/show.abc1"));
        assert!(is_http_url("http://localhost:8080/x"));
        assert!(!is_http_url("ftp://9anime.to"));
        assert!(!is_http_url("9anime.to/watch"));
        assert!(!is_http_url(""));
    }

    #[test]
    fn test_pinned_anime_validation() {
        assert!(PinnedAnime::new("Show", "https://9anime.to/watch/show.1").is_ok());
        assert!(matches!(
            PinnedAnime::new("  ", "https://9anime.to/watch/show.1"),
            Err(PinError::Invalid { .. })
        ));
        assert!(matches!(
            PinnedAnime::new("Show", "javascript:alert(1)"),
            Err(PinError::Invalid { .. })
        ));
    }

    #[test]
    fn test_status_results() {
        assert_eq!(PinStatus::Added.as_result(), "success");
        assert_eq!(PinStatus::Removed.as_result(), "success");
        assert_eq!(PinStatus::Duplicate.as_result(), "duplicate");
        assert_eq!(PinStatus::NotFound.as_result(), "notFound");
    }
}
