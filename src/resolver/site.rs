//! Production [`EpisodeSource`] combining both resolver stages.

use async_trait::async_trait;
use reqwest::Client;

use super::http_client::{ResolverHttpTimeouts, build_resolver_http_client};
use super::{EpisodeSource, FileCandidate, FileLister, GrabberInfo, MetadataResolver, UpstreamError};

/// Talks to the real site. One HTTP client serves both stages.
#[derive(Debug, Clone)]
pub struct SiteClient {
    client: Client,
    update_flag: u8,
    files: FileLister,
}

impl SiteClient {
    /// Creates a client with the given resolver timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when HTTP client construction fails.
    pub fn new(timeouts: ResolverHttpTimeouts) -> Result<Self, UpstreamError> {
        let client = build_resolver_http_client(timeouts)?;
        Ok(Self {
            files: FileLister::with_client(client.clone()),
            client,
            update_flag: 0,
        })
    }

    /// Sets the `update` flag sent to the metadata endpoint.
    #[must_use]
    pub fn with_update_flag(mut self, update_flag: u8) -> Self {
        self.update_flag = update_flag;
        self
    }

    /// Sets the `mobile` flag sent to the grabber.
    #[must_use]
    pub fn with_mobile_flag(mut self, mobile_flag: u8) -> Self {
        self.files = self.files.with_mobile_flag(mobile_flag);
        self
    }
}

#[async_trait]
impl EpisodeSource for SiteClient {
    async fn resolve_metadata(
        &self,
        base_url: &str,
        episode_id: &str,
    ) -> Result<GrabberInfo, UpstreamError> {
        MetadataResolver::with_client(self.client.clone(), base_url)
            .with_update_flag(self.update_flag)
            .resolve(episode_id)
            .await
    }

    async fn list_files(&self, grabber: &GrabberInfo) -> Result<Vec<FileCandidate>, UpstreamError> {
        self.files.list(grabber).await
    }
}
