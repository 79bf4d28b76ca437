//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use episode_dl::download::DispatchMode;
use episode_dl::settings::Quality;

/// Batch-download anime episodes, one throttled request at a time.
///
/// Resolves each episode through the site's metadata and grabber endpoints,
/// keeps files of the requested quality, and either downloads them or prints
/// links for an external download manager.
#[derive(Parser, Debug)]
#[command(name = "episode-dl")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Pinned list database (default: <config dir>/pins.db)
    #[arg(long, global = true, value_name = "FILE")]
    pub pins_db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download a batch of episodes
    Download(DownloadArgs),

    /// Manage the pinned anime list
    Pin {
        #[command(subcommand)]
        action: PinAction,
    },

    /// Run one JSON intent message and print the JSON response
    Message {
        /// Message JSON (read from stdin when omitted)
        json: Option<String>,
    },
}

/// Options for `download`.
#[derive(ClapArgs, Debug)]
pub struct DownloadArgs {
    /// Anime name used in file names and link titles
    #[arg(short, long)]
    pub name: String,

    /// JSON file with `[{"id": .., "number": ..}]` (read from stdin when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub episodes: Option<PathBuf>,

    /// Quality to keep: 360p, 480p, 720p, 1080p
    #[arg(long)]
    pub quality: Option<Quality>,

    /// Site mirror root
    #[arg(long)]
    pub base_url: Option<String>,

    /// Dispatch mode: local (alias browser) or external
    #[arg(short, long)]
    pub mode: Option<DispatchMode>,

    /// Delay between episodes in milliseconds (max 60000)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub interval: Option<u64>,

    /// Root directory for local downloads
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Folder created under the output directory
    #[arg(long)]
    pub container: Option<String>,

    /// Skip episodes that fail upstream instead of aborting the batch
    #[arg(long)]
    pub skip_failed: bool,
}

/// `pin` actions.
#[derive(Subcommand, Debug)]
pub enum PinAction {
    /// Pin an anime
    Add {
        /// Display name
        name: String,
        /// Anime page URL
        url: String,
    },
    /// Unpin an anime by URL
    Remove {
        /// Anime page URL
        url: String,
    },
    /// List pinned anime
    List,
}
