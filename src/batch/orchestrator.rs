//! Sequential, throttled batch loop.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::options::parse_episodes;
use super::{BatchError, BatchOptions, EpisodeRequest, FailurePolicy};
use crate::download::{
    BatchOutput, DispatchMode, DispatchSink, DownloadManager, DownloadTarget, LocalDownload,
    Scheduler, Throttle, TokioScheduler, destination_filename, external_link,
};
use crate::resolver::{EpisodeSource, FileCandidate, UpstreamError};

/// Where a batch currently is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BatchPhase {
    /// No batch has started.
    #[default]
    Idle,
    /// Fetching grabber parameters for an episode.
    Resolving {
        /// Upstream id of the episode.
        episode_id: String,
    },
    /// Fetching candidate files for an episode.
    Listing {
        /// Upstream id of the episode.
        episode_id: String,
    },
    /// Routing matched files to the sink.
    Dispatching {
        /// Upstream id of the episode.
        episode_id: String,
    },
    /// Waiting out the request interval.
    Throttling,
    /// Queue drained.
    Done,
    /// Stopped on an upstream failure.
    Failed,
    /// Stopped by the cancellation token.
    Cancelled,
}

impl BatchPhase {
    /// Returns true for `Done`, `Failed`, and `Cancelled`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

/// An episode dropped under [`FailurePolicy::SkipFailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEpisode {
    /// The episode that failed.
    pub episode: EpisodeRequest,
    /// Rendered upstream error.
    pub reason: String,
}

/// Result of a completed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Status string (local) or ordered link list (external).
    pub output: BatchOutput,
    /// Episodes whose resolve and list stages both succeeded.
    pub episodes_processed: usize,
    /// Files handed to the sink across all episodes.
    pub files_dispatched: usize,
    /// Episodes skipped after an upstream failure.
    pub skipped: Vec<SkippedEpisode>,
}

/// Drives episodes through resolve, list, and dispatch one at a time.
///
/// Batches on one orchestrator run one after another. The cancellation token
/// is shared by all of them; once cancelled it stays cancelled.
pub struct BatchOrchestrator {
    source: Arc<dyn EpisodeSource>,
    scheduler: Arc<dyn Scheduler>,
    manager: Option<Arc<dyn DownloadManager>>,
    cancel: CancellationToken,
    phase: watch::Sender<BatchPhase>,
    running: Mutex<()>,
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("has_download_manager", &self.manager.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("phase", &*self.phase.borrow())
            .finish_non_exhaustive()
    }
}

impl BatchOrchestrator {
    /// Creates an orchestrator over `source` with a tokio scheduler and no
    /// local download manager.
    #[must_use]
    pub fn new(source: Arc<dyn EpisodeSource>) -> Self {
        let (phase, _) = watch::channel(BatchPhase::Idle);
        Self {
            source,
            scheduler: Arc::new(TokioScheduler),
            manager: None,
            cancel: CancellationToken::new(),
            phase,
            running: Mutex::new(()),
        }
    }

    /// Replaces the scheduler used for the throttle.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Attaches the download manager used in local mode.
    #[must_use]
    pub fn with_download_manager(mut self, manager: Arc<dyn DownloadManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Returns a handle that cancels running and future batches.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Subscribes to phase changes.
    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<BatchPhase> {
        self.phase.subscribe()
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> BatchPhase {
        self.phase.borrow().clone()
    }

    /// Runs a batch from a JSON episode list.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidInput`] before any network call if
    /// `episodes` is not an array of `{id, number}` objects; otherwise as
    /// [`BatchOrchestrator::download_all`].
    pub async fn download_all_json(
        &self,
        episodes: &Value,
        options: &BatchOptions,
    ) -> Result<BatchOutcome, BatchError> {
        let episodes = parse_episodes(episodes)?;
        self.download_all(episodes, options).await
    }

    /// Runs a batch to completion.
    ///
    /// Each episode is resolved, listed, filtered to `options.quality` (exact
    /// match, no fallback), and dispatched. The throttle then waits
    /// `options.request_interval` before the next iteration. Only one upstream
    /// request is ever in flight.
    ///
    /// # Errors
    ///
    /// - [`BatchError::MissingDownloadManager`] for local mode without a manager
    /// - [`BatchError::Upstream`] on the first failure under fail-fast
    /// - [`BatchError::Cancelled`] when the token fires between episodes
    #[instrument(
        skip(self, episodes, options),
        fields(episodes = episodes.len(), quality = %options.quality, mode = %options.mode)
    )]
    pub async fn download_all(
        &self,
        episodes: Vec<EpisodeRequest>,
        options: &BatchOptions,
    ) -> Result<BatchOutcome, BatchError> {
        let _guard = self.running.lock().await;

        let mut sink = match options.mode {
            DispatchMode::Local => DispatchSink::Local(
                self.manager
                    .clone()
                    .ok_or(BatchError::MissingDownloadManager)?,
            ),
            DispatchMode::External => DispatchSink::External(Vec::new()),
        };
        let throttle = Throttle::new(options.request_interval, self.scheduler.clone());
        if !throttle.is_within_recommended_range() {
            debug!(
                interval_ms = options.request_interval.as_millis(),
                "request interval outside the recommended 2-5s range"
            );
        }

        let mut queue: VecDeque<EpisodeRequest> = episodes.into();
        let mut episodes_processed = 0;
        let mut files_dispatched = 0;
        let mut skipped = Vec::new();

        while let Some(episode) = queue.pop_front() {
            if self.cancel.is_cancelled() {
                let remaining = queue.len() + 1;
                info!(remaining, "batch cancelled");
                self.set_phase(BatchPhase::Cancelled);
                return Err(BatchError::Cancelled { remaining });
            }

            match self.process_episode(&episode, options, &mut sink).await {
                Ok(count) => {
                    episodes_processed += 1;
                    files_dispatched += count;
                }
                Err(error) => match options.failure_policy {
                    FailurePolicy::FailFast => {
                        warn!(
                            episode_id = %episode.id,
                            episode_number = %episode.number,
                            error = %error,
                            "episode failed, aborting batch"
                        );
                        self.set_phase(BatchPhase::Failed);
                        return Err(BatchError::upstream(
                            episode.id,
                            episode.number.to_string(),
                            error,
                        ));
                    }
                    FailurePolicy::SkipFailed => {
                        warn!(
                            episode_id = %episode.id,
                            episode_number = %episode.number,
                            error = %error,
                            "episode failed, skipping"
                        );
                        skipped.push(SkippedEpisode {
                            reason: error.to_string(),
                            episode,
                        });
                    }
                },
            }

            self.set_phase(BatchPhase::Throttling);
            tokio::select! {
                () = self.cancel.cancelled() => {}
                () = throttle.wait() => {}
            }
        }

        self.set_phase(BatchPhase::Done);
        info!(episodes_processed, files_dispatched, skipped = skipped.len(), "batch complete");
        Ok(BatchOutcome {
            output: sink.finish(),
            episodes_processed,
            files_dispatched,
            skipped,
        })
    }

    async fn process_episode(
        &self,
        episode: &EpisodeRequest,
        options: &BatchOptions,
        sink: &mut DispatchSink,
    ) -> Result<usize, UpstreamError> {
        self.set_phase(BatchPhase::Resolving {
            episode_id: episode.id.clone(),
        });
        let grabber = self
            .source
            .resolve_metadata(&options.base_url, &episode.id)
            .await?;

        self.set_phase(BatchPhase::Listing {
            episode_id: episode.id.clone(),
        });
        let files = self.source.list_files(&grabber).await?;

        self.set_phase(BatchPhase::Dispatching {
            episode_id: episode.id.clone(),
        });
        let mut count = 0;
        for file in files
            .into_iter()
            .filter(|file| file.quality_label == options.quality)
        {
            sink.dispatch(build_target(episode, &file, options));
            count += 1;
        }
        if count == 0 {
            debug!(
                episode_id = %episode.id,
                quality = %options.quality,
                "no file matches the requested quality"
            );
        }
        Ok(count)
    }

    fn set_phase(&self, phase: BatchPhase) {
        self.phase.send_replace(phase);
    }
}

fn build_target(
    episode: &EpisodeRequest,
    file: &FileCandidate,
    options: &BatchOptions,
) -> DownloadTarget {
    match options.mode {
        DispatchMode::Local => DownloadTarget::Local(LocalDownload {
            source_url: file.file_url.clone(),
            destination_filename: destination_filename(
                &options.container,
                &options.name,
                &episode.number,
                &options.quality,
                &file.file_type,
            ),
            conflict_policy: options.conflict_policy,
        }),
        DispatchMode::External => DownloadTarget::External(external_link(
            &file.file_url,
            &options.name,
            &episode.number,
            &options.quality,
        )),
    }
}
