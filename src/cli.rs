//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use tele_dl::download::{DEFAULT_FILE_BASE, DEFAULT_RETRIES, DEFAULT_WORKERS};
use tele_dl::page::DEFAULT_API_BASE;

/// Download every image, video and audio file embedded in a Telegraph page.
#[derive(Parser, Debug)]
#[command(name = "tele-dl")]
#[command(author, version, about)]
pub struct Args {
    /// Telegraph page URL, e.g. https://telegra.ph/Some-Page-01-01
    #[arg(short, long, value_name = "URL")]
    pub link: String,

    /// Directory to save files into (created if missing)
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Maximum concurrent downloads (1-256)
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_WORKERS as u16,
        value_parser = clap::value_parser!(u16).range(1..=256)
    )]
    pub workers: u16,

    /// Per-request timeout in seconds
    #[arg(
        short,
        long,
        value_name = "SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..=3600)
    )]
    pub timeout: u64,

    /// Overall deadline in seconds; downloads still running are cancelled
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub deadline: Option<u64>,

    /// Retries after a failed attempt (0-10)
    #[arg(
        long,
        default_value_t = DEFAULT_RETRIES as u8,
        value_parser = clap::value_parser!(u8).range(0..=10)
    )]
    pub retries: u8,

    /// Linear backoff unit in milliseconds (wait is unit x attempt)
    #[arg(
        long,
        value_name = "MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(0..=60000)
    )]
    pub backoff_ms: u64,

    /// Show a progress bar (default)
    #[arg(long, overrides_with = "no_progress")]
    pub progress: bool,

    /// Hide the progress bar
    #[arg(long, overrides_with = "progress")]
    pub no_progress: bool,

    /// Suppress non-error output (implies --no-progress)
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Only download files with this extension (repeatable)
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Telegraph API endpoint the page path is appended to
    #[arg(long, value_name = "URL", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Base URL for relative media paths
    #[arg(long, value_name = "URL", default_value = DEFAULT_FILE_BASE)]
    pub file_base: String,
}

impl Args {
    /// Whether the progress bar should be drawn (ignoring terminal detection).
    pub fn progress_requested(&self) -> bool {
        !self.quiet && !self.no_progress
    }

    /// Default log level when `RUST_LOG` is unset.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}
