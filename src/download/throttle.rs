//! Request throttling between batch iterations.
//!
//! The batch loop waits a fixed interval after dispatching one episode before
//! resolving the next. The wait goes through a [`Scheduler`] so tests can
//! substitute a recording scheduler or run under tokio's paused clock.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use episode_dl::download::{Throttle, TokioScheduler};
//!
//! # async fn example() {
//! let throttle = Throttle::new(Duration::from_millis(2000), Arc::new(TokioScheduler));
//! throttle.wait().await;
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

/// Interval below which upstream mirrors are known to start refusing requests.
pub const RECOMMENDED_MIN_INTERVAL: Duration = Duration::from_millis(2000);

/// Interval above which a batch gets needlessly slow.
pub const RECOMMENDED_MAX_INTERVAL: Duration = Duration::from_millis(5000);

/// Source of delays for the batch loop.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Completes after `duration` has elapsed.
    async fn sleep(&self, duration: Duration);
}

/// Scheduler backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fixed-interval throttle applied between episodes of a batch.
#[derive(Clone)]
pub struct Throttle {
    interval: Duration,
    scheduler: Arc<dyn Scheduler>,
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl Throttle {
    /// Creates a throttle that waits `interval` through `scheduler`.
    #[must_use]
    pub fn new(interval: Duration, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            interval,
            scheduler,
        }
    }

    /// Returns the configured interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true if the interval lies in the recommended 2-5 second range.
    #[must_use]
    pub fn is_within_recommended_range(&self) -> bool {
        (RECOMMENDED_MIN_INTERVAL..=RECOMMENDED_MAX_INTERVAL).contains(&self.interval)
    }

    /// Waits one interval. A zero interval returns immediately.
    #[instrument(skip(self), fields(interval_ms = self.interval.as_millis()))]
    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }
        debug!("throttling before next episode");
        self.scheduler.sleep(self.interval).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingScheduler {
        calls: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Scheduler for RecordingScheduler {
        async fn sleep(&self, duration: Duration) {
            self.calls.lock().unwrap().push(duration);
        }
    }

    #[tokio::test]
    async fn test_throttle_wait_uses_scheduler() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let throttle = Throttle::new(Duration::from_millis(3000), scheduler.clone());
        throttle.wait().await;
        throttle.wait().await;
        assert_eq!(
            *scheduler.calls.lock().unwrap(),
            vec![Duration::from_millis(3000); 2]
        );
    }

    #[tokio::test]
    async fn test_throttle_zero_interval_skips_scheduler() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let throttle = Throttle::new(Duration::ZERO, scheduler.clone());
        throttle.wait().await;
        assert!(scheduler.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_sleeps_full_interval() {
        let throttle = Throttle::new(Duration::from_secs(5), Arc::new(TokioScheduler));
        let start = tokio::time::Instant::now();
        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[test]
    fn test_recommended_range() {
        let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler);
        assert!(Throttle::new(Duration::from_millis(2000), scheduler.clone()).is_within_recommended_range());
        assert!(Throttle::new(Duration::from_millis(5000), scheduler.clone()).is_within_recommended_range());
        assert!(!Throttle::new(Duration::from_millis(500), scheduler.clone()).is_within_recommended_range());
        assert!(!Throttle::new(Duration::from_millis(9000), scheduler).is_within_recommended_range());
    }
}
