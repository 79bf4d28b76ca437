//! File grabber lookup: `GET {grabber}?id=..&token=..&options=..&mobile=..`.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::http_client::{ResolverHttpTimeouts, build_resolver_http_client, fetch_json};
use super::{FileCandidate, GrabberInfo, UpstreamError};

#[derive(Debug, Deserialize)]
struct FileListBody {
    data: Vec<FileCandidate>,
}

/// Lists downloadable files for resolved grabber parameters.
#[derive(Clone)]
pub struct FileLister {
    client: Client,
    mobile_flag: u8,
}

impl std::fmt::Debug for FileLister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLister")
            .field("mobile_flag", &self.mobile_flag)
            .finish_non_exhaustive()
    }
}

impl FileLister {
    /// Creates a lister with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when HTTP client construction fails.
    pub fn new() -> Result<Self, UpstreamError> {
        let client = build_resolver_http_client(ResolverHttpTimeouts::default())?;
        Ok(Self::with_client(client))
    }

    /// Creates a lister reusing an existing client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            mobile_flag: 0,
        }
    }

    /// Sets the `mobile` query flag (default 0).
    #[must_use]
    pub fn with_mobile_flag(mut self, mobile_flag: u8) -> Self {
        self.mobile_flag = mobile_flag;
        self
    }

    /// Fetches the candidate files, in upstream order.
    ///
    /// Query parameters are appended to any query the grabber URL already has.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] on transport failure, non-2xx status, or a
    /// body without a `data` array of `{label, file, type}` records.
    #[instrument(skip(self, grabber), fields(episode_id = %grabber.episode_id))]
    pub async fn list(&self, grabber: &GrabberInfo) -> Result<Vec<FileCandidate>, UpstreamError> {
        let mut url = Url::parse(&grabber.grabber_url)
            .map_err(|e| UpstreamError::invalid_url(&grabber.grabber_url, e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("id", &grabber.episode_id)
            .append_pair("token", &grabber.token)
            .append_pair("options", &grabber.options.to_query_value())
            .append_pair("mobile", &self.mobile_flag.to_string());

        let body: FileListBody = fetch_json(&self.client, url).await?;
        debug!(count = body.data.len(), "grabber listed files");
        Ok(body.data)
    }
}
