//! Error types for upstream lookups.
//!
//! Both remote stages (episode metadata and file grabber) fail with the same
//! [`UpstreamError`]. The batch treats every variant alike; the variants exist
//! so logs and messages can say what went wrong.

use thiserror::Error;

/// Errors from the metadata endpoint or the file grabber.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport failure (DNS, refused connection, TLS, broken body stream).
    #[error("network error requesting {url}: {source}\n  Suggestion: Check connectivity or try another mirror")]
    Network {
        /// The requested URL.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete in time.
    #[error("timeout requesting {url}\n  Suggestion: Increase the resolver timeout or retry later")]
    Timeout {
        /// The requested URL.
        url: String,
    },

    /// Non-success HTTP status.
    #[error("HTTP {status} from {url}\n  Suggestion: The mirror may be throttling; raise the request interval")]
    HttpStatus {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body was not JSON of the expected shape.
    #[error("unexpected response from {url}: {reason}\n  Suggestion: The site API may have changed")]
    MalformedBody {
        /// The requested URL.
        url: String,
        /// What was wrong with the body.
        reason: String,
    },

    /// An endpoint URL could not be built.
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL or base URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {reason}")]
    ClientBuild {
        /// Builder error text.
        reason: String,
    },
}

impl UpstreamError {
    /// Creates a transport error, promoting timeouts to [`UpstreamError::Timeout`].
    #[must_use]
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::Timeout { url: url.into() };
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    #[must_use]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a malformed body error.
    #[must_use]
    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedBody {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns the URL involved, when there is one.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Network { url, .. }
            | Self::Timeout { url }
            | Self::HttpStatus { url, .. }
            | Self::MalformedBody { url, .. }
            | Self::InvalidUrl { url, .. } => Some(url),
            Self::ClientBuild { .. } => None,
        }
    }
}
