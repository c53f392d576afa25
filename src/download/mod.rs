//! Concurrent media downloader streaming files to disk.
//!
//! This module turns a list of [`MediaItem`](crate::extract::MediaItem)s into
//! files in an output directory, with bounded parallelism, per-job retry with
//! linear backoff, skip-if-exists and cancellation.
//!
//! # Features
//!
//! - Streaming downloads through a 32 KiB buffer (memory-efficient for large files)
//! - Fixed worker pool fed from a bounded channel
//! - Not-found responses (404, 410) stop retries immediately
//! - Partial files are removed on any failure, cancellation included
//! - Exactly one [`DownloadResult`] per job, even for jobs cut off by cancellation
//!
//! # Example
//!
//! ```no_run
//! use tele_dl::download::{DownloadOptions, Downloader, HttpClient, RetryPolicy};
//! use tele_dl::extract::MediaItem;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = DownloadOptions::new("./downloads")
//!     .with_workers(8)
//!     .with_retry_policy(RetryPolicy::with_retries(2));
//! let downloader = Downloader::new(HttpClient::new(), options)?;
//! let jobs = vec![MediaItem::new("https://telegra.ph/file/abc.jpg", "0_abc.jpg")];
//! let (stats, _) = downloader.download_all(jobs, &CancellationToken::new(), |_| {}).await;
//! println!("Downloaded {} bytes", stats.total_size);
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod client;
mod constants;
mod engine;
mod error;
mod retry;

pub use aggregate::{DownloadOutcome, DownloadResult, DownloadStats, ResultAggregator};
pub use client::HttpClient;
pub use constants::{DEFAULT_FILE_BASE, DEFAULT_TIMEOUT, USER_AGENT};
pub use engine::{DEFAULT_WORKERS, DownloadOptions, Downloader, EngineError, resolve_url};
pub use error::{AttemptError, AttemptErrors, DownloadError};
pub use retry::{
    DEFAULT_BACKOFF_UNIT, DEFAULT_RETRIES, FailureType, RetryDecision, RetryPolicy,
    classify_error,
};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
