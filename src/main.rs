//! CLI entry point for episode-dl.

use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use episode_dl::commands::{Capabilities, CommandHandler, PageOpener};
use episode_dl::download::{
    BatchOutput, CONNECT_TIMEOUT_SECS, DispatchMode, HttpClient, READ_TIMEOUT_SECS,
    TokioDownloadManager,
};
use episode_dl::pins::{PinStore, PinnedAnime, SqlitePinStore};
use episode_dl::{
    BatchError, BatchOptions, BatchOrchestrator, Database, FailurePolicy, Settings, SiteClient,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::{FileConfig, load_file_config_from, resolve_pins_db_path};
use cli::{Args, Command, DownloadArgs, PinAction};

/// Prints pages to stdout; a terminal has no tabs to open.
struct StdoutOpener;

impl PageOpener for StdoutOpener {
    fn open(&self, url: &str) {
        println!("{url}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = load_file_config_from(args.config.as_deref())?;
    let file_config = loaded.file_config();
    if loaded.config.is_some() {
        debug!(path = ?loaded.path, "loaded config file");
    }
    if file_config.interval_outside_recommended() {
        warn!(
            request_interval_ms = file_config.request_interval_ms,
            "configured request interval is outside the recommended 2000-5000 ms range"
        );
    }

    let mut settings = Settings::default();
    file_config.apply_to(&mut settings);
    let pins_db = args
        .pins_db
        .clone()
        .unwrap_or_else(|| resolve_pins_db_path(&file_config));

    match args.command {
        Command::Download(download) => run_download(download, settings, &file_config).await,
        Command::Pin { action } => run_pin(action, &pins_db).await,
        Command::Message { json } => run_message(json, settings, &file_config, &pins_db).await,
    }
}

async fn run_download(args: DownloadArgs, mut settings: Settings, file_config: &FileConfig) -> Result<()> {
    // CLI flags override file values
    if let Some(quality) = args.quality {
        settings.quality = quality;
    }
    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(mode) = args.mode {
        settings.mode = mode;
    }
    if let Some(ms) = args.interval {
        settings.request_interval = Duration::from_millis(ms);
    }
    if let Some(output_dir) = args.output_dir {
        settings.output_dir = output_dir;
    }
    if let Some(container) = args.container {
        settings.container = container;
    }

    let episodes_json = read_input(args.episodes.as_deref(), "episode list")?;
    let episodes: Value =
        serde_json::from_str(&episodes_json).context("Episode list is not valid JSON")?;

    let mut options: BatchOptions = settings.batch_options(&args.name);
    if args.skip_failed {
        options.failure_policy = FailurePolicy::SkipFailed;
    }

    let (orchestrator, manager) = build_orchestrator(&settings, file_config)?;
    let orchestrator = Arc::new(orchestrator);
    let cancel_guard = spawn_ctrl_c_canceller(orchestrator.cancellation_token());

    info!(
        name = %options.name,
        quality = %options.quality,
        mode = %options.mode,
        "starting batch"
    );
    let result = orchestrator.download_all_json(&episodes, &options).await;
    cancel_guard.cancel();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(BatchError::Cancelled { remaining }) => {
            warn!(remaining, "batch cancelled; waiting for started downloads");
            manager.wait_idle().await;
            bail!("Batch cancelled with {remaining} episode(s) left");
        }
        Err(error) => return Err(error).context("Batch failed"),
    };

    for skipped in &outcome.skipped {
        warn!(
            episode_id = %skipped.episode.id,
            episode_number = %skipped.episode.number,
            reason = %skipped.reason,
            "episode skipped"
        );
    }

    match &outcome.output {
        BatchOutput::Links(links) => {
            for link in links {
                println!("{link}");
            }
        }
        BatchOutput::Status(status) => {
            manager.wait_idle().await;
            println!("{status}");
        }
    }

    info!(
        episodes = outcome.episodes_processed,
        files = outcome.files_dispatched,
        skipped = outcome.skipped.len(),
        "batch complete"
    );
    Ok(())
}

async fn run_pin(action: PinAction, pins_db: &Path) -> Result<()> {
    let db = Database::new(pins_db)
        .await
        .with_context(|| format!("Failed to open pins database '{}'", pins_db.display()))?;
    let store = SqlitePinStore::new(db.clone());

    match action {
        PinAction::Add { name, url } => {
            let pin = PinnedAnime::new(name, url)?;
            let change = store.add(pin).await?;
            println!("{} ({} pinned)", change.status.as_result(), change.item_count);
        }
        PinAction::Remove { url } => {
            let change = store.remove(&url).await?;
            println!("{} ({} pinned)", change.status.as_result(), change.item_count);
        }
        PinAction::List => {
            for pin in store.list().await? {
                println!("{}\t{}", pin.name, pin.url);
            }
        }
    }

    db.close().await;
    Ok(())
}

async fn run_message(
    json: Option<String>,
    settings: Settings,
    file_config: &FileConfig,
    pins_db: &Path,
) -> Result<()> {
    let raw = match json {
        Some(json) => json,
        None => read_input(None, "message")?,
    };
    let message: Value = serde_json::from_str(&raw).context("Message is not valid JSON")?;

    let db = Database::new(pins_db)
        .await
        .with_context(|| format!("Failed to open pins database '{}'", pins_db.display()))?;
    let (orchestrator, manager) = build_orchestrator(&settings, file_config)?;
    let orchestrator = Arc::new(orchestrator);
    let cancel_guard = spawn_ctrl_c_canceller(orchestrator.cancellation_token());

    let handler = CommandHandler::new(Capabilities {
        opener: Arc::new(StdoutOpener),
        pins: Arc::new(SqlitePinStore::new(db.clone())),
        batch: Some(orchestrator),
        settings,
    });

    let reply = handler.handle_value(&message);
    if reply.is_pending() {
        debug!("awaiting asynchronous response");
    }
    let response = reply.resolve().await;
    cancel_guard.cancel();
    manager.wait_idle().await;

    println!("{}", serde_json::to_string(&response)?);
    db.close().await;
    Ok(())
}

fn build_orchestrator(
    settings: &Settings,
    file_config: &FileConfig,
) -> Result<(BatchOrchestrator, Arc<TokioDownloadManager>)> {
    let source = SiteClient::new(settings.resolver_timeouts)?;
    let client = match (
        file_config.download_connect_timeout_secs,
        file_config.download_read_timeout_secs,
    ) {
        (None, None) => HttpClient::new(),
        (connect, read) => HttpClient::new_with_timeouts(
            connect.unwrap_or(CONNECT_TIMEOUT_SECS),
            read.unwrap_or(READ_TIMEOUT_SECS),
        ),
    };
    let manager = Arc::new(TokioDownloadManager::new(client, &settings.output_dir));
    if settings.mode == DispatchMode::Local {
        debug!(output_dir = %manager.output_dir().display(), "local downloads enabled");
    }
    let orchestrator =
        BatchOrchestrator::new(Arc::new(source)).with_download_manager(manager.clone());
    Ok((orchestrator, manager))
}

/// Cancels `token` on Ctrl-C. Cancel the returned guard to stop listening.
fn spawn_ctrl_c_canceller(token: CancellationToken) -> CancellationToken {
    let guard = CancellationToken::new();
    let listening = guard.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    warn!("interrupt received, stopping after the current episode");
                    token.cancel();
                }
            }
            () = listening.cancelled() => {}
        }
    });
    guard
}

fn read_input(path: Option<&Path>, what: &str) -> Result<String> {
    if let Some(path) = path {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {what} from '{}'", path.display()));
    }
    if io::stdin().is_terminal() {
        bail!("No {what} provided. Pass a file or pipe JSON via stdin.");
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .with_context(|| format!("Failed to read {what} from stdin"))?;
    Ok(buffer)
}
