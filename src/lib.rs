//! Episode batch downloader library.
//!
//! Resolves anime episodes through a site's two-stage API (episode metadata,
//! then the file grabber), keeps files of the requested quality, and hands
//! them to a local download manager or collects them as links for an
//! external one. Episodes are processed strictly one at a time with a fixed
//! delay between them.
//!
//! # Architecture
//!
//! - [`resolver`] - metadata and file-list lookups behind [`resolver::EpisodeSource`]
//! - [`batch`] - the sequential, throttled, cancellable batch loop
//! - [`download`] - naming, dispatch sinks, local streaming downloads, throttle
//! - [`commands`] - intent-based request/response surface
//! - [`pins`] - pinned-anime list storage
//! - [`db`] - SQLite connection and migrations
//! - [`settings`] - defaults shared by the CLI and the command surface
//! - [`encoding`] - JavaScript-compatible URI encoding

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod commands;
pub mod db;
pub mod download;
pub mod encoding;
pub mod pins;
pub mod resolver;
pub mod settings;
mod user_agent;

// Re-export commonly used types
pub use batch::{
    BatchError, BatchOptions, BatchOrchestrator, BatchOutcome, BatchPhase, EpisodeNumber,
    EpisodeRequest, FailurePolicy,
};
pub use db::{Database, DbError};
pub use download::{BatchOutput, DispatchMode, HttpClient, TokioDownloadManager, sanitize};
pub use resolver::{EpisodeSource, FileCandidate, GrabberInfo, SiteClient, UpstreamError};
pub use settings::{Quality, Settings};
