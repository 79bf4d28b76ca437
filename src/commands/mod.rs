//! Request/response message surface.
//!
//! Each message names an `intent`; the handler answers with a [`Response`]
//! `{result, itemCount?, data?}`. Quick intents answer with
//! [`Reply::Ready`]; storage and download intents answer with
//! [`Reply::Pending`], a future that the transport awaits before replying.
//!
//! Handlers only touch what [`Capabilities`] hands them.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use episode_dl::commands::{Capabilities, CommandHandler, PageOpener};
//! use episode_dl::pins::MemoryPinStore;
//! use episode_dl::settings::Settings;
//! use serde_json::json;
//!
//! struct NoopOpener;
//! impl PageOpener for NoopOpener {
//!     fn open(&self, _url: &str) {}
//! }
//!
//! # async fn example() {
//! let handler = CommandHandler::new(Capabilities {
//!     opener: Arc::new(NoopOpener),
//!     pins: Arc::new(MemoryPinStore::new()),
//!     batch: None,
//!     settings: Settings::default(),
//! });
//! let response = handler.handle_value(&json!({"intent": "hello"})).resolve().await;
//! assert_eq!(response.result, "Background page is working properly.");
//! # }
//! ```

mod links;

pub use links::{clean_title, extract_anime_id, reddit_discussion_url};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::batch::{BatchOrchestrator, EpisodeNumber};
use crate::download::DispatchMode;
use crate::pins::{PinChange, PinStore, PinnedAnime, is_http_url};
use crate::settings::Settings;

/// Reply to `hello`.
pub const HELLO_RESULT: &str = "Background page is working properly.";

/// Result for intents that opened a page.
pub const OPENED_RESULT: &str = "opened";

/// Result for successful storage and download intents.
pub const SUCCESS_RESULT: &str = "success";

/// Result for rejected or failed intents.
pub const FAIL_RESULT: &str = "fail";

/// One incoming message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent")]
pub enum Intent {
    /// Liveness check.
    #[serde(rename = "hello")]
    Hello,

    /// Open the configured site.
    #[serde(rename = "open_9anime")]
    OpenSite,

    /// Open an anime page.
    #[serde(rename = "open_anime")]
    OpenAnime {
        /// Page to open.
        #[serde(default)]
        anime_url: String,
    },

    /// Pull the anime id out of a watch URL.
    #[serde(rename = "extractIdFromUrl")]
    ExtractIdFromUrl {
        /// Watch URL.
        #[serde(default)]
        anime_url: String,
    },

    /// Open the reddit search for discussion threads.
    #[serde(rename = "openRedditDiscussion", rename_all = "camelCase")]
    OpenRedditDiscussion {
        /// Anime name as shown on the site.
        #[serde(default)]
        name: String,
        /// Episode number, when searching one episode's thread.
        #[serde(default)]
        episode: Option<EpisodeNumber>,
        /// Other titles to OR into the search.
        #[serde(default)]
        alternate_names: Vec<String>,
    },

    /// Pin an anime.
    #[serde(rename = "addPinnedAnime", rename_all = "camelCase")]
    AddPinnedAnime {
        /// Display name.
        #[serde(default)]
        anime_name: String,
        /// Anime page URL.
        #[serde(default)]
        anime_url: String,
    },

    /// Unpin an anime.
    #[serde(rename = "removePinnedAnime", rename_all = "camelCase")]
    RemovePinnedAnime {
        /// Anime page URL.
        #[serde(default)]
        anime_url: String,
    },

    /// Run a download batch.
    #[serde(rename = "downloadAll", rename_all = "camelCase")]
    DownloadAll {
        /// Episode list; validated by the batch.
        #[serde(default)]
        episodes: Value,
        /// Anime name.
        #[serde(default)]
        name: String,
        /// Quality label; settings default when absent.
        #[serde(default)]
        quality: Option<String>,
        /// Site mirror; settings default when absent.
        #[serde(default)]
        base_url: Option<String>,
        /// Dispatch mode; settings default when absent.
        #[serde(default)]
        method: Option<DispatchMode>,
        /// Interval in milliseconds; settings default when absent.
        #[serde(default)]
        request_interval: Option<u64>,
    },
}

impl Intent {
    /// Returns the wire name of the intent.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello => "hello",
            Self::OpenSite => "open_9anime",
            Self::OpenAnime { .. } => "open_anime",
            Self::ExtractIdFromUrl { .. } => "extractIdFromUrl",
            Self::OpenRedditDiscussion { .. } => "openRedditDiscussion",
            Self::AddPinnedAnime { .. } => "addPinnedAnime",
            Self::RemovePinnedAnime { .. } => "removePinnedAnime",
            Self::DownloadAll { .. } => "downloadAll",
        }
    }
}

/// Answer to one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Outcome label.
    pub result: String,
    /// List size after a pin change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
    /// Payload: extracted id, batch output, or error text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    /// A response with only a result label.
    #[must_use]
    pub fn result(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            item_count: None,
            data: None,
        }
    }

    /// A `fail` response.
    #[must_use]
    pub fn fail() -> Self {
        Self::result(FAIL_RESULT)
    }

    /// A `fail` response carrying error text.
    #[must_use]
    pub fn fail_with(error: impl fmt::Display) -> Self {
        Self::fail().with_data(Value::String(error.to_string()))
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    fn from_pin_change(change: PinChange) -> Self {
        Self {
            result: change.status.as_result().to_string(),
            item_count: Some(change.item_count),
            data: None,
        }
    }
}

/// Handler output: an immediate response or one still being computed.
pub enum Reply {
    /// Answered synchronously.
    Ready(Response),
    /// Answered once the future completes; the channel must stay open.
    Pending(BoxFuture<'static, Response>),
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(response) => f.debug_tuple("Ready").field(response).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

impl Reply {
    /// Returns true for [`Reply::Pending`].
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Waits for the response.
    pub async fn resolve(self) -> Response {
        match self {
            Self::Ready(response) => response,
            Self::Pending(future) => future.await,
        }
    }
}

/// Opens a page for the user (a browser tab, a terminal line, ...).
pub trait PageOpener: Send + Sync {
    /// Opens `url`. Fire-and-forget.
    fn open(&self, url: &str);
}

/// Everything a handler may touch.
#[derive(Clone)]
pub struct Capabilities {
    /// Page opener.
    pub opener: Arc<dyn PageOpener>,
    /// Pinned-list storage.
    pub pins: Arc<dyn PinStore>,
    /// Batch runner; `downloadAll` fails without one.
    pub batch: Option<Arc<BatchOrchestrator>>,
    /// Defaults for omitted options.
    pub settings: Settings,
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("batch", &self.batch.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Routes intents to their handlers.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    caps: Capabilities,
}

impl CommandHandler {
    /// Creates a handler over `caps`.
    #[must_use]
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }

    /// Handles a raw JSON message. Unknown or malformed messages get `fail`.
    #[must_use]
    pub fn handle_value(&self, message: &Value) -> Reply {
        match Intent::deserialize(message) {
            Ok(intent) => self.handle(intent),
            Err(error) => {
                warn!(error = %error, "unrecognized message");
                Reply::Ready(Response::fail_with(error))
            }
        }
    }

    /// Handles one intent.
    #[must_use]
    pub fn handle(&self, intent: Intent) -> Reply {
        debug!(intent = intent.name(), "handling message");
        match intent {
            Intent::Hello => Reply::Ready(Response::result(HELLO_RESULT)),
            Intent::OpenSite => {
                self.caps.opener.open(&self.caps.settings.base_url);
                Reply::Ready(Response::result(OPENED_RESULT))
            }
            Intent::OpenAnime { anime_url } => Reply::Ready(self.open_anime(&anime_url)),
            Intent::ExtractIdFromUrl { anime_url } => {
                Reply::Ready(match extract_anime_id(&anime_url) {
                    Some(id) => Response::result(SUCCESS_RESULT).with_data(Value::String(id)),
                    None => Response::fail(),
                })
            }
            Intent::OpenRedditDiscussion {
                name,
                episode,
                alternate_names,
            } => Reply::Ready(self.open_reddit(&name, episode.as_ref(), &alternate_names)),
            Intent::AddPinnedAnime {
                anime_name,
                anime_url,
            } => self.add_pin(anime_name, anime_url),
            Intent::RemovePinnedAnime { anime_url } => self.remove_pin(anime_url),
            Intent::DownloadAll {
                episodes,
                name,
                quality,
                base_url,
                method,
                request_interval,
            } => {
                let mut options = self.caps.settings.batch_options(name);
                if let Some(quality) = quality {
                    options.quality = quality;
                }
                if let Some(base_url) = base_url {
                    options.base_url = base_url;
                }
                if let Some(mode) = method {
                    options.mode = mode;
                }
                if let Some(ms) = request_interval {
                    options.request_interval = Duration::from_millis(ms);
                }
                self.download_all(episodes, options)
            }
        }
    }

    fn open_anime(&self, anime_url: &str) -> Response {
        if !is_http_url(anime_url) {
            return Response::fail();
        }
        self.caps.opener.open(anime_url);
        Response::result(OPENED_RESULT)
    }

    fn open_reddit(
        &self,
        name: &str,
        episode: Option<&EpisodeNumber>,
        alternate_names: &[String],
    ) -> Response {
        if name.is_empty() {
            return Response::fail();
        }
        let episode = episode.filter(|e| is_present(e)).map(ToString::to_string);
        let url = reddit_discussion_url(name, episode.as_deref(), alternate_names);
        self.caps.opener.open(&url);
        Response::result(OPENED_RESULT)
    }

    fn add_pin(&self, anime_name: String, anime_url: String) -> Reply {
        let pin = match PinnedAnime::new(anime_name, anime_url) {
            Ok(pin) => pin,
            Err(error) => {
                debug!(error = %error, "rejected pin");
                return Reply::Ready(Response::fail());
            }
        };
        let pins = Arc::clone(&self.caps.pins);
        Reply::Pending(
            async move {
                match pins.add(pin).await {
                    Ok(change) => Response::from_pin_change(change),
                    Err(error) => {
                        warn!(error = %error, "pin add failed");
                        Response::fail_with(error)
                    }
                }
            }
            .boxed(),
        )
    }

    fn remove_pin(&self, anime_url: String) -> Reply {
        if !is_http_url(&anime_url) {
            return Reply::Ready(Response::fail());
        }
        let pins = Arc::clone(&self.caps.pins);
        Reply::Pending(
            async move {
                match pins.remove(&anime_url).await {
                    Ok(change) => Response::from_pin_change(change),
                    Err(error) => {
                        warn!(error = %error, "pin remove failed");
                        Response::fail_with(error)
                    }
                }
            }
            .boxed(),
        )
    }

    fn download_all(&self, episodes: Value, options: crate::batch::BatchOptions) -> Reply {
        let Some(batch) = self.caps.batch.clone() else {
            return Reply::Ready(Response::fail_with("download batches are not available"));
        };
        Reply::Pending(
            async move {
                match batch.download_all_json(&episodes, &options).await {
                    Ok(outcome) => {
                        info!(
                            episodes = outcome.episodes_processed,
                            files = outcome.files_dispatched,
                            "downloadAll finished"
                        );
                        let data = serde_json::to_value(&outcome.output).unwrap_or(Value::Null);
                        Response::result(SUCCESS_RESULT).with_data(data)
                    }
                    Err(error) => Response::fail_with(error),
                }
            }
            .boxed(),
        )
    }
}

/// Truthiness of an episode value as the extension pages send it: an empty
/// string or a numeric zero means "no episode".
fn is_present(episode: &EpisodeNumber) -> bool {
    match episode {
        EpisodeNumber::Text(text) => !text.is_empty(),
        EpisodeNumber::Number(number) => number.as_f64().is_some_and(|n| n.abs() > 0.0),
    }
}
