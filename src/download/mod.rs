//! Naming, dispatch, and throttling for matched episode files.
//!
//! # Features
//!
//! - Filesystem-safe episode naming ([`sanitize`], [`destination_filename`])
//! - Two dispatch modes: local download manager or external link list
//! - Streaming local downloads with browser-style conflict uniquification
//! - Injectable scheduler for the inter-episode throttle
//!
//! # Example
//!
//! ```
//! use episode_dl::download::{destination_filename, sanitize};
//!
//! assert_eq!(sanitize("Fate/Zero"), "Fate_Zero");
//! assert_eq!(
//!     destination_filename("9anime Companion", "Fate/Zero", 3, "720p", "mp4"),
//!     "9anime Companion/Fate_Zero - E3 (720p).mp4"
//! );
//! ```

mod client;
mod error;
mod filename;
mod sink;
pub mod throttle;

pub use client::{CONNECT_TIMEOUT_SECS, HttpClient, READ_TIMEOUT_SECS};
pub use error::DownloadError;
pub use filename::{destination_filename, episode_title, external_link, sanitize};
pub use sink::{
    BatchOutput, ConflictPolicy, DispatchMode, DispatchSink, DownloadManager, DownloadTarget,
    LOCAL_COMPLETION_STATUS, LocalDownload, TokioDownloadManager,
};
pub use throttle::{Scheduler, Throttle, TokioScheduler};
