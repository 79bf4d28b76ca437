//! Dispatch of matched episode files.
//!
//! A matched file is routed one of two ways, depending on [`DispatchMode`]:
//!
//! - [`DispatchMode::Local`] hands a [`LocalDownload`] to a [`DownloadManager`]
//!   and returns immediately. Completion is never awaited and failures are
//!   never reported back to the batch.
//! - [`DispatchMode::External`] appends the file URL, tagged with an encoded
//!   title, to an ordered link list returned when the batch completes.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::client::HttpClient;
use super::filename::{destination_path, resolve_unique_path};

/// Status returned by a completed local-mode batch.
pub const LOCAL_COMPLETION_STATUS: &str = "All downloads are over";

/// How matched files leave the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Hand each file to the local download manager.
    #[default]
    #[serde(alias = "browser")]
    Local,
    /// Collect each file as a link for an external download manager.
    External,
}

impl DispatchMode {
    /// Returns the stable string label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::External => "external",
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" | "browser" => Ok(Self::Local),
            "external" => Ok(Self::External),
            other => Err(format!(
                "unknown dispatch mode '{other}' (expected local or external)"
            )),
        }
    }
}

/// What the local download manager does when the destination already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Pick a fresh name: `file (1).mp4`, `file (2).mp4`, ...
    #[default]
    Uniquify,
    /// Replace the existing file.
    Overwrite,
}

/// A request for the local download manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalDownload {
    /// The file URL returned by the grabber.
    pub source_url: String,
    /// Relative destination, `<container>/<title>.<type>`.
    pub destination_filename: String,
    /// Conflict handling for an existing destination.
    pub conflict_policy: ConflictPolicy,
}

/// Terminal artifact of one matching file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    /// Local download descriptor.
    Local(LocalDownload),
    /// Link string for an external download manager.
    External(String),
}

/// Final output of a batch, by mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BatchOutput {
    /// Local mode: fixed completion status.
    Status(String),
    /// External mode: produced links in episode order.
    Links(Vec<String>),
}

/// Local download manager collaborator.
///
/// `submit` is deliberately synchronous: the batch hands the request over and
/// moves on without waiting for, or learning about, the transfer outcome.
pub trait DownloadManager: Send + Sync {
    /// Accepts a download request.
    fn submit(&self, request: LocalDownload);
}

/// Routes download targets to the active output and accumulates links.
///
/// Owned by a single batch run and consumed when the batch completes.
pub enum DispatchSink {
    /// Local mode sink.
    Local(Arc<dyn DownloadManager>),
    /// External mode sink with accumulated links.
    External(Vec<String>),
}

impl fmt::Debug for DispatchSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(_) => f.write_str("DispatchSink::Local"),
            Self::External(links) => f
                .debug_tuple("DispatchSink::External")
                .field(&links.len())
                .finish(),
        }
    }
}

impl DispatchSink {
    /// Returns the mode this sink serves.
    #[must_use]
    pub fn mode(&self) -> DispatchMode {
        match self {
            Self::Local(_) => DispatchMode::Local,
            Self::External(_) => DispatchMode::External,
        }
    }

    /// Routes one target. A target that does not match the sink's mode is dropped.
    pub fn dispatch(&mut self, target: DownloadTarget) {
        match (self, target) {
            (Self::Local(manager), DownloadTarget::Local(request)) => {
                debug!(destination = %request.destination_filename, "submitting local download");
                manager.submit(request);
            }
            (Self::External(links), DownloadTarget::External(link)) => links.push(link),
            (sink, target) => {
                warn!(mode = %sink.mode(), ?target, "dropping target for mismatched dispatch mode");
            }
        }
    }

    /// Consumes the sink into the batch output.
    #[must_use]
    pub fn finish(self) -> BatchOutput {
        match self {
            Self::Local(_) => BatchOutput::Status(LOCAL_COMPLETION_STATUS.to_string()),
            Self::External(links) => BatchOutput::Links(links),
        }
    }
}

/// Download manager that streams each request on its own tokio task.
///
/// Destinations are resolved under `output_dir` when a request is submitted,
/// and stay claimed until its transfer ends, so two pending requests never
/// share a path. Transfer failures are logged and otherwise swallowed.
#[derive(Debug)]
pub struct TokioDownloadManager {
    client: HttpClient,
    output_dir: PathBuf,
    claimed: Arc<Mutex<HashSet<PathBuf>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TokioDownloadManager {
    /// Creates a manager writing under `output_dir`.
    #[must_use]
    pub fn new(client: HttpClient, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
            claimed: Arc::new(Mutex::new(HashSet::new())),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Returns the root directory downloads are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Waits for every download submitted so far.
    ///
    /// Not used by the batch itself; the CLI calls it before exiting so the
    /// process does not drop in-flight transfers.
    pub async fn wait_idle(&self) {
        loop {
            let pending: Vec<JoinHandle<()>> = match self.tasks.lock() {
                Ok(mut tasks) => tasks.drain(..).collect(),
                Err(_) => return,
            };
            if pending.is_empty() {
                return;
            }
            for handle in pending {
                if let Err(error) = handle.await {
                    warn!(error = %error, "download task panicked or was cancelled");
                }
            }
        }
    }
}

impl DownloadManager for TokioDownloadManager {
    fn submit(&self, request: LocalDownload) {
        let path = {
            let mut claimed = lock_claims(&self.claimed);
            let path = match request.conflict_policy {
                ConflictPolicy::Uniquify => resolve_unique_path(
                    &self.output_dir,
                    &request.destination_filename,
                    |path| claimed.contains(path),
                ),
                ConflictPolicy::Overwrite => {
                    destination_path(&self.output_dir, &request.destination_filename)
                }
            };
            claimed.insert(path.clone());
            path
        };
        let client = self.client.clone();
        let claims = Arc::clone(&self.claimed);
        let handle = tokio::spawn(async move {
            match client.download_to_path(&request.source_url, &path).await {
                Ok(bytes) => info!(path = %path.display(), bytes, "episode saved"),
                Err(error) => warn!(
                    error = %error,
                    destination = %request.destination_filename,
                    "local download failed"
                ),
            }
            lock_claims(&claims).remove(&path);
        });
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.retain(|task| !task.is_finished());
            tasks.push(handle);
        }
    }
}

fn lock_claims(claims: &Mutex<HashSet<PathBuf>>) -> MutexGuard<'_, HashSet<PathBuf>> {
    claims
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingManager {
        requests: Mutex<Vec<LocalDownload>>,
    }

    impl DownloadManager for RecordingManager {
        fn submit(&self, request: LocalDownload) {
            self.requests.lock().unwrap().push(request);
        }
    }

    fn local_request(n: u32) -> LocalDownload {
        LocalDownload {
            source_url: format!("http://x/{n}.mp4"),
            destination_filename: format!("Box/Show - E{n} (720p).mp4"),
            conflict_policy: ConflictPolicy::Uniquify,
        }
    }

    #[test]
    fn test_dispatch_mode_parse_accepts_browser_alias() {
        assert_eq!("local".parse::<DispatchMode>().unwrap(), DispatchMode::Local);
        assert_eq!("browser".parse::<DispatchMode>().unwrap(), DispatchMode::Local);
        assert_eq!("External".parse::<DispatchMode>().unwrap(), DispatchMode::External);
        assert!("ftp".parse::<DispatchMode>().is_err());
    }

    #[test]
    fn test_dispatch_mode_serde_alias() {
        let mode: DispatchMode = serde_json::from_str("\"browser\"").unwrap();
        assert_eq!(mode, DispatchMode::Local);
        assert_eq!(serde_json::to_string(&DispatchMode::External).unwrap(), "\"external\"");
    }

    #[test]
    fn test_local_sink_submits_and_finishes_with_status() {
        let manager = Arc::new(RecordingManager::default());
        let mut sink = DispatchSink::Local(manager.clone());
        sink.dispatch(DownloadTarget::Local(local_request(1)));
        sink.dispatch(DownloadTarget::Local(local_request(2)));

        assert_eq!(manager.requests.lock().unwrap().len(), 2);
        assert_eq!(
            sink.finish(),
            BatchOutput::Status(LOCAL_COMPLETION_STATUS.to_string())
        );
    }

    #[test]
    fn test_external_sink_preserves_order() {
        let mut sink = DispatchSink::External(Vec::new());
        sink.dispatch(DownloadTarget::External("a".into()));
        sink.dispatch(DownloadTarget::External("b".into()));
        assert_eq!(sink.finish(), BatchOutput::Links(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_mismatched_target_is_dropped() {
        let manager = Arc::new(RecordingManager::default());
        let mut sink = DispatchSink::Local(manager.clone());
        sink.dispatch(DownloadTarget::External("a".into()));
        assert!(manager.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_batch_output_serializes_untagged() {
        let links = BatchOutput::Links(vec!["x".into()]);
        assert_eq!(serde_json::to_string(&links).unwrap(), r#"["x"]"#);
        let status = BatchOutput::Status("done".into());
        assert_eq!(serde_json::to_string(&status).unwrap(), r#""done""#);
    }

    #[tokio::test]
    async fn test_uniquify_keeps_both_files_for_same_destination() {
        use std::time::Duration;

        use tempfile::TempDir;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/first.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"first".to_vec())
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/second.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"second".to_vec()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let manager = TokioDownloadManager::new(HttpClient::new(), temp.path());
        for file in ["first", "second"] {
            manager.submit(LocalDownload {
                source_url: format!("{}/{file}.mp4", server.uri()),
                destination_filename: "Box/Show - E1 (720p).mp4".to_string(),
                conflict_policy: ConflictPolicy::Uniquify,
            });
        }
        manager.wait_idle().await;

        let dir = temp.path().join("Box");
        assert_eq!(std::fs::read(dir.join("Show - E1 (720p).mp4")).unwrap(), b"first");
        assert_eq!(std::fs::read(dir.join("Show - E1 (720p) (1).mp4")).unwrap(), b"second");
        assert!(manager.claimed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_stays_under_output_dir() {
        use tempfile::TempDir;
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let manager = TokioDownloadManager::new(HttpClient::new(), temp.path());
        manager.submit(LocalDownload {
            source_url: format!("{}/ep.mp4", server.uri()),
            destination_filename: "/escape/Show.mp4".to_string(),
            conflict_policy: ConflictPolicy::Overwrite,
        });
        manager.wait_idle().await;

        let saved = temp.path().join("escape").join("Show.mp4");
        assert_eq!(std::fs::read(saved).unwrap(), b"data");
    }
}
