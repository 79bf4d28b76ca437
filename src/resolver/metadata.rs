//! Episode metadata lookup: `GET {base}/ajax/episode/info`.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::http_client::{ResolverHttpTimeouts, build_resolver_http_client, fetch_json};
use super::{GrabberInfo, GrabberOptions, UpstreamError, string_or_number};

/// Site used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://9anime.to";

const EPISODE_INFO_PATH: &str = "/ajax/episode/info";

#[derive(Debug, Deserialize)]
struct EpisodeInfoBody {
    grabber: String,
    params: GrabberParams,
}

#[derive(Debug, Deserialize)]
struct GrabberParams {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(deserialize_with = "string_or_number")]
    token: String,
    #[serde(default)]
    options: Value,
}

/// Resolves an episode id into grabber parameters.
#[derive(Clone)]
pub struct MetadataResolver {
    client: Client,
    base_url: String,
    update_flag: u8,
}

impl std::fmt::Debug for MetadataResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataResolver")
            .field("base_url", &self.base_url)
            .field("update_flag", &self.update_flag)
            .finish_non_exhaustive()
    }
}

impl MetadataResolver {
    /// Creates a resolver against [`DEFAULT_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when HTTP client construction fails.
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a resolver against a custom site root.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when HTTP client construction fails.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, UpstreamError> {
        let client = build_resolver_http_client(ResolverHttpTimeouts::default())?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a resolver reusing an existing client.
    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            update_flag: 0,
        }
    }

    /// Sets the `update` query flag (default 0).
    #[must_use]
    pub fn with_update_flag(mut self, update_flag: u8) -> Self {
        self.update_flag = update_flag;
        self
    }

    /// Returns the site root.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches grabber parameters for one episode.
    ///
    /// A relative or protocol-relative `grabber` is resolved against the
    /// endpoint URL, the way a page-relative request would be.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] on transport failure, non-2xx status, or a
    /// body missing `grabber`/`params`. No retry.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn resolve(&self, episode_id: &str) -> Result<GrabberInfo, UpstreamError> {
        let mut endpoint = episode_info_url(&self.base_url)?;
        endpoint
            .query_pairs_mut()
            .append_pair("id", episode_id)
            .append_pair("update", &self.update_flag.to_string());

        let body: EpisodeInfoBody = fetch_json(&self.client, endpoint.clone()).await?;
        let grabber_url = endpoint
            .join(&body.grabber)
            .map_err(|e| UpstreamError::invalid_url(&body.grabber, e.to_string()))?;
        debug!(grabber = %grabber_url, "resolved grabber");

        Ok(GrabberInfo {
            grabber_url: grabber_url.into(),
            episode_id: body.params.id,
            token: body.params.token,
            options: GrabberOptions::new(body.params.options),
        })
    }
}

fn episode_info_url(base_url: &str) -> Result<Url, UpstreamError> {
    let raw = format!("{}{EPISODE_INFO_PATH}", base_url.trim_end_matches('/'));
    Url::parse(&raw).map_err(|e| UpstreamError::invalid_url(base_url, e.to_string()))
}
