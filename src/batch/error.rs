//! Error types for batch runs.

use thiserror::Error;

use crate::resolver::UpstreamError;

/// Terminal failures of a batch. No partial result accompanies any of them.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The batch request was malformed. Raised before any network call.
    #[error("invalid batch input: {reason}\n  Suggestion: Pass an array of {{\"id\", \"number\"}} objects")]
    InvalidInput {
        /// What was wrong with the input.
        reason: String,
    },

    /// An upstream stage failed for one episode and the batch stopped.
    #[error("episode {episode_number} (id {episode_id}) failed: {source}")]
    Upstream {
        /// Upstream id of the failing episode.
        episode_id: String,
        /// Display number of the failing episode.
        episode_number: String,
        /// The underlying upstream failure.
        #[source]
        source: UpstreamError,
    },

    /// The cancellation token fired before the queue drained.
    #[error("batch cancelled with {remaining} episode(s) left")]
    Cancelled {
        /// Episodes never started.
        remaining: usize,
    },

    /// Local mode was requested but no download manager is attached.
    #[error("local dispatch requested but no download manager is configured\n  Suggestion: Use external mode or attach a download manager")]
    MissingDownloadManager,
}

impl BatchError {
    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Wraps an upstream failure with the episode it happened on.
    #[must_use]
    pub fn upstream(
        episode_id: impl Into<String>,
        episode_number: impl Into<String>,
        source: UpstreamError,
    ) -> Self {
        Self::Upstream {
            episode_id: episode_id.into(),
            episode_number: episode_number.into(),
            source,
        }
    }

    /// Returns true for [`BatchError::Cancelled`].
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message() {
        let msg = BatchError::invalid_input("episodes must be an array").to_string();
        assert!(msg.contains("episodes must be an array"));
        assert!(msg.contains("Suggestion"));
    }

    #[test]
    fn test_upstream_message_names_episode() {
        let error = BatchError::upstream("ep2", "2", UpstreamError::http_status("http://x/ajax", 500));
        let msg = error.to_string();
        assert!(msg.contains("episode 2"));
        assert!(msg.contains("ep2"));
        assert!(msg.contains("500"));
    }

    #[test]
    fn test_is_cancelled() {
        assert!(BatchError::Cancelled { remaining: 2 }.is_cancelled());
        assert!(!BatchError::MissingDownloadManager.is_cancelled());
    }
}
