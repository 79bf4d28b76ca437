//! Shared HTTP client construction and JSON fetching for resolvers.
//!
//! Both upstream stages use one client so they share timeouts, user-agent,
//! compression, and the connection pool.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::UpstreamError;
use crate::user_agent;

/// Default resolver connect timeout in seconds.
pub const RESOLVER_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default resolver read timeout in seconds.
pub const RESOLVER_READ_TIMEOUT_SECS: u64 = 30;

/// Timeouts applied to resolver requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverHttpTimeouts {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: u64,
}

impl Default for ResolverHttpTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout_secs: RESOLVER_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: RESOLVER_READ_TIMEOUT_SECS,
        }
    }
}

/// Builds the resolver HTTP client.
///
/// # Errors
///
/// Returns [`UpstreamError::ClientBuild`] when client construction fails.
pub fn build_resolver_http_client(timeouts: ResolverHttpTimeouts) -> Result<Client, UpstreamError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_timeout_secs))
        .timeout(Duration::from_secs(timeouts.read_timeout_secs))
        .user_agent(user_agent::default_user_agent())
        .gzip(true)
        .build()
        .map_err(|error| UpstreamError::ClientBuild {
            reason: error.to_string(),
        })
}

/// Issues one GET and decodes the JSON body into `T`.
///
/// jQuery-style semantics: any non-2xx status rejects, and a body that is not
/// JSON of the expected shape rejects. No retry.
#[instrument(level = "debug", skip(client), fields(url = %url))]
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    url: Url,
) -> Result<T, UpstreamError> {
    let response = client
        .get(url.clone())
        .header(ACCEPT, "application/json, text/javascript, */*; q=0.01")
        .send()
        .await
        .map_err(|e| UpstreamError::network(url.as_str(), e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::http_status(url.as_str(), status.as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| UpstreamError::network(url.as_str(), e))?;
    debug!(bytes = body.len(), "received upstream body");

    serde_json::from_str(&body).map_err(|e| UpstreamError::malformed(url.as_str(), e.to_string()))
}
