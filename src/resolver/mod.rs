//! Two-stage upstream lookup: episode metadata, then the file grabber.
//!
//! # Architecture
//!
//! - [`MetadataResolver`] - fetches grabber parameters for one episode id
//! - [`FileLister`] - fetches candidate files from the grabber
//! - [`EpisodeSource`] - async trait the batch drives; lets tests substitute stubs
//! - [`SiteClient`] - production [`EpisodeSource`] sharing one HTTP client
//!
//! # Example
//!
//! ```no_run
//! use episode_dl::resolver::{FileLister, MetadataResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = MetadataResolver::with_base_url("https://9anime.to")?;
//! let grabber = resolver.resolve("ep-1234").await?;
//! let files = FileLister::new()?.list(&grabber).await?;
//! for file in files {
//!     println!("{} {}", file.quality_label, file.file_url);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod files;
mod http_client;
mod metadata;
mod site;

pub use error::UpstreamError;
pub use files::FileLister;
pub use http_client::{
    RESOLVER_CONNECT_TIMEOUT_SECS, RESOLVER_READ_TIMEOUT_SECS, ResolverHttpTimeouts,
    build_resolver_http_client,
};
pub use metadata::{DEFAULT_BASE_URL, MetadataResolver};
pub use site::SiteClient;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Opaque grabber options, forwarded to the file grabber unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrabberOptions(Value);

impl GrabberOptions {
    /// Wraps a raw JSON value.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the raw JSON value.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Renders the value for the `options` query parameter.
    ///
    /// Strings go out as-is, `null` as an empty string, anything else as
    /// compact JSON.
    #[must_use]
    pub fn to_query_value(&self) -> String {
        match &self.0 {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Grabber parameters for one episode. Produced by [`MetadataResolver`],
/// consumed by [`FileLister`].
#[derive(Debug, Clone, PartialEq)]
pub struct GrabberInfo {
    /// Absolute grabber endpoint.
    pub grabber_url: String,
    /// Episode id as the grabber knows it.
    pub episode_id: String,
    /// Access token for the grabber.
    pub token: String,
    /// Opaque options blob.
    pub options: GrabberOptions,
}

/// One downloadable variant of an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCandidate {
    /// Resolution tag, e.g. `720p`.
    #[serde(rename = "label")]
    pub quality_label: String,
    /// Direct file URL.
    #[serde(rename = "file")]
    pub file_url: String,
    /// File extension without the dot, e.g. `mp4`.
    #[serde(rename = "type")]
    pub file_type: String,
}

/// Both upstream stages, as driven by the batch.
#[async_trait]
pub trait EpisodeSource: Send + Sync {
    /// Fetches grabber parameters for `episode_id` from the site at `base_url`.
    async fn resolve_metadata(
        &self,
        base_url: &str,
        episode_id: &str,
    ) -> Result<GrabberInfo, UpstreamError>;

    /// Fetches the candidate files described by `grabber`.
    async fn list_files(&self, grabber: &GrabberInfo) -> Result<Vec<FileCandidate>, UpstreamError>;
}

/// Accepts a JSON string or number and yields its string form.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_file_candidate_wire_names() {
        let candidate: FileCandidate =
            serde_json::from_value(json!({"label": "720p", "file": "http://x/b.mp4", "type": "mp4"}))
                .unwrap();
        assert_eq!(candidate.quality_label, "720p");
        assert_eq!(candidate.file_url, "http://x/b.mp4");
        assert_eq!(candidate.file_type, "mp4");
    }

    #[test]
    fn test_grabber_options_query_value() {
        assert_eq!(GrabberOptions::new(json!("abc==")).to_query_value(), "abc==");
        assert_eq!(GrabberOptions::new(Value::Null).to_query_value(), "");
        assert_eq!(
            GrabberOptions::new(json!({"a": 1})).to_query_value(),
            r#"{"a":1}"#
        );
    }

    #[test]
    fn test_string_or_number() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(deserialize_with = "string_or_number")]
            id: String,
        }
        let text: Wrapper = serde_json::from_value(json!({"id": "abc"})).unwrap();
        let number: Wrapper = serde_json::from_value(json!({"id": 42})).unwrap();
        assert_eq!(text.id, "abc");
        assert_eq!(number.id, "42");
        assert!(serde_json::from_value::<Wrapper>(json!({"id": [1]})).is_err());
    }
}
