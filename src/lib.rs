//! tele-dl Core Library
//!
//! This library fetches a Telegraph page, extracts the media it embeds in
//! document order, and downloads those files concurrently with retry,
//! skip-if-exists and cancellation.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`page`] - Page content tree model and the Telegraph API client
//! - [`extract`] - Lazy pre-order media extraction, deduplication and validation
//! - [`download`] - Worker-pool download engine with streaming support
//!
//! # Example
//!
//! ```no_run
//! use tele_dl::download::{DownloadOptions, Downloader, HttpClient};
//! use tele_dl::extract::{MediaExtractor, deduplicate};
//! use tele_dl::page::{DEFAULT_API_BASE, PageSource, TelegraphClient, extract_page_path};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let path = extract_page_path("https://telegra.ph/Sample-01-01")?;
//! let client = TelegraphClient::new(DEFAULT_API_BASE, std::time::Duration::from_secs(30))?;
//! let page = client.fetch_page(&path).await?;
//!
//! let items = deduplicate(&MediaExtractor::new().extract(&page.nodes));
//! let downloader = Downloader::new(HttpClient::new(), DownloadOptions::new("./downloads"))?;
//! let (stats, _) = downloader.download_all(items, &CancellationToken::new(), |_| {}).await;
//! println!("{} downloaded, {} failed", stats.successful, stats.failed);
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod extract;
pub mod page;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use download::{
    DEFAULT_WORKERS, DownloadError, DownloadOptions, DownloadOutcome, DownloadResult,
    DownloadStats, Downloader, EngineError, HttpClient, RetryPolicy,
};
pub use extract::{MediaExtractor, MediaItem, deduplicate, validate};
pub use page::{ContentNode, FetchError, Page, PageSource, TelegraphClient};
