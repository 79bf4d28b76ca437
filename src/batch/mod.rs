//! Batch episode downloads.
//!
//! A batch takes an ordered episode queue and, for each episode in turn,
//! resolves grabber parameters, lists candidate files, keeps those matching
//! the requested quality, and dispatches them. A fixed interval separates
//! episodes so the upstream sees at most one request at a time.
//!
//! ```text
//! Idle -> Resolving -> Listing -> Dispatching -> Throttling -> Resolving(next) | Done
//!            \            \
//!             +------------+--> Failed          (fail-fast)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use episode_dl::batch::{BatchOptions, BatchOrchestrator, EpisodeRequest};
//! use episode_dl::download::DispatchMode;
//! use episode_dl::resolver::{ResolverHttpTimeouts, SiteClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = SiteClient::new(ResolverHttpTimeouts::default())?;
//! let orchestrator = BatchOrchestrator::new(Arc::new(source));
//! let options = BatchOptions::new("Cowboy Bebop")
//!     .with_quality("720p")
//!     .with_mode(DispatchMode::External);
//! let outcome = orchestrator
//!     .download_all(vec![EpisodeRequest::new("abc1", 1_u64)], &options)
//!     .await?;
//! println!("{:?}", outcome.output);
//! # Ok(())
//! # }
//! ```

mod error;
mod options;
mod orchestrator;

pub use error::BatchError;
pub use options::{
    BatchOptions, DEFAULT_CONTAINER, DEFAULT_QUALITY, DEFAULT_REQUEST_INTERVAL, EpisodeNumber,
    EpisodeRequest, FailurePolicy, parse_episodes,
};
pub use orchestrator::{BatchOrchestrator, BatchOutcome, BatchPhase, SkippedEpisode};
