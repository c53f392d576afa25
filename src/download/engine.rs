//! Download engine for concurrent media downloads with retry support.
//!
//! This module provides the [`Downloader`], which runs a fixed pool of
//! workers over a bounded job channel and folds their results into
//! [`DownloadStats`].
//!
//! # Overview
//!
//! A feeder task pushes jobs into a channel sized to the worker count.
//! Workers share the receiving end, run each job (skip check, URL
//! resolution, attempts with linear backoff) and send exactly one
//! [`DownloadResult`] per job. The calling task drains results, so the
//! aggregator and the progress callback only ever run on one task.
//!
//! # Example
//!
//! ```no_run
//! use tele_dl::download::{DownloadOptions, Downloader, HttpClient};
//! use tele_dl::extract::MediaItem;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Downloader::new(HttpClient::new(), DownloadOptions::new("./downloads"))?;
//! let jobs = vec![MediaItem::new("/file/abc.jpg", "0_abc.jpg")];
//! let (stats, _results) = downloader
//!     .download_all(jobs, &CancellationToken::new(), |done| println!("{done} done"))
//!     .await;
//! println!("Successful: {}, Failed: {}", stats.successful, stats.failed);
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::aggregate::{DownloadOutcome, DownloadResult, DownloadStats, ResultAggregator};
use super::constants::DEFAULT_FILE_BASE;
use super::error::AttemptErrors;
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use super::{DownloadError, HttpClient};
use crate::extract::MediaItem;

/// Minimum allowed worker count.
const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
const MAX_WORKERS: usize = 256;

/// Default worker count if not specified.
pub const DEFAULT_WORKERS: usize = 50;

/// Error type for download engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid worker count provided.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkers {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Settings for a [`Downloader`].
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Concurrency ceiling.
    pub workers: usize,
    /// Attempts and backoff per job.
    pub retry_policy: RetryPolicy,
    /// Directory every filename is joined onto. Must already exist.
    pub output_dir: PathBuf,
    /// Prefix for media URLs that are not absolute.
    pub file_base: String,
}

impl DownloadOptions {
    /// Defaults for everything but the output directory.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            retry_policy: RetryPolicy::default(),
            output_dir: output_dir.into(),
            file_base: DEFAULT_FILE_BASE.to_string(),
        }
    }

    /// Sets the worker count.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Sets the base URL for relative media paths.
    #[must_use]
    pub fn with_file_base(mut self, file_base: impl Into<String>) -> Self {
        self.file_base = file_base.into();
        self
    }
}

/// Concurrent downloader with a fixed worker pool.
///
/// # Concurrency Model
///
/// - `min(workers, jobs)` worker tasks share one bounded job channel
/// - A feeder task only takes a job off the list once a channel slot is reserved
/// - Results flow back over a channel sized to the job count, so workers never block on it
/// - The caller's task drains results; stats are never shared between tasks
///
/// # Cancellation
///
/// Firing the token stops the feeder, aborts in-flight requests and backoff
/// waits, and makes every worker exit after its current job. Jobs that never
/// reached a worker still get a cancelled result.
#[derive(Debug)]
pub struct Downloader {
    runner: Arc<JobRunner>,
    workers: usize,
}

impl Downloader {
    /// Creates a downloader.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWorkers`] if the worker count is outside
    /// the valid range (1-256).
    ///
    /// # Example
    ///
    /// ```
    /// use tele_dl::download::{DownloadOptions, Downloader, HttpClient};
    ///
    /// let options = DownloadOptions::new("./out").with_workers(8);
    /// let downloader = Downloader::new(HttpClient::new(), options).unwrap();
    /// assert_eq!(downloader.workers(), 8);
    /// ```
    #[instrument(level = "debug", skip_all, fields(workers = options.workers))]
    pub fn new(client: HttpClient, options: DownloadOptions) -> Result<Self, EngineError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&options.workers) {
            return Err(EngineError::InvalidWorkers {
                value: options.workers,
            });
        }

        debug!(
            max_attempts = options.retry_policy.max_attempts(),
            backoff_ms = options.retry_policy.backoff_unit().as_millis(),
            output_dir = %options.output_dir.display(),
            file_base = %options.file_base,
            "creating downloader"
        );

        Ok(Self {
            workers: options.workers,
            runner: Arc::new(JobRunner {
                client,
                retry_policy: options.retry_policy,
                output_dir: options.output_dir,
                file_base: options.file_base,
            }),
        })
    }

    /// Returns the configured worker count.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.runner.retry_policy
    }

    /// Downloads every job and returns stats plus one result per job.
    ///
    /// `on_progress` is called on the calling task once per drained result
    /// with the running count. Results are in completion order.
    ///
    /// Per-job failures never abort the run; they end up in that job's result.
    #[instrument(skip_all, fields(jobs = jobs.len(), workers = self.workers))]
    pub async fn download_all<F>(
        &self,
        jobs: Vec<MediaItem>,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> (DownloadStats, Vec<DownloadResult>)
    where
        F: FnMut(usize),
    {
        let total = jobs.len();
        let mut aggregator = ResultAggregator::with_capacity(total);

        if total == 0 {
            debug!("no jobs to download");
            return aggregator.finish();
        }

        let worker_count = self.workers.min(total);
        info!(total, worker_count, "starting downloads");

        let (job_tx, job_rx) = mpsc::channel::<MediaItem>(worker_count);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<DownloadResult>(total);

        let feeder = tokio::spawn(feed_jobs(jobs, job_tx, cancel.clone()));

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            handles.push(tokio::spawn(run_worker(
                worker_id,
                Arc::clone(&self.runner),
                Arc::clone(&job_rx),
                result_tx.clone(),
                cancel.clone(),
            )));
        }
        drop(result_tx);

        while let Some(result) = result_rx.recv().await {
            on_progress(aggregator.record(result));
        }

        for handle in handles {
            // A panicked worker loses its current job; the shortfall is logged below.
            if let Err(e) = handle.await {
                warn!(error = %e, "download worker panicked");
            }
        }

        // Workers are gone. Anything still queued or never fed was cut off by cancellation.
        let mut leftovers = {
            let mut rx = job_rx.lock().await;
            rx.close();
            let mut buffered = Vec::new();
            while let Ok(item) = rx.try_recv() {
                buffered.push(item);
            }
            buffered
        };
        match feeder.await {
            Ok(remaining) => leftovers.extend(remaining),
            Err(e) => warn!(error = %e, "job feeder panicked"),
        }
        if !leftovers.is_empty() {
            debug!(count = leftovers.len(), "recording undispatched jobs as cancelled");
        }
        for item in leftovers {
            on_progress(aggregator.record(DownloadResult::cancelled(item)));
        }

        if aggregator.drained() < total {
            warn!(
                drained = aggregator.drained(),
                total, "some jobs produced no result"
            );
        }

        let (stats, results) = aggregator.finish();
        info!(
            successful = stats.successful,
            failed = stats.failed,
            skipped = stats.skipped,
            retried = stats.retried,
            bytes = stats.total_size,
            duration_ms = stats.duration.as_millis(),
            "downloads complete"
        );
        (stats, results)
    }
}

/// Pushes jobs in order, reserving a slot before taking each one.
///
/// Returns the jobs it never handed over.
async fn feed_jobs(
    jobs: Vec<MediaItem>,
    tx: mpsc::Sender<MediaItem>,
    cancel: CancellationToken,
) -> Vec<MediaItem> {
    let mut pending = VecDeque::from(jobs);

    while !pending.is_empty() {
        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            permit = tx.reserve() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };
        if let Some(item) = pending.pop_front() {
            permit.send(item);
        }
    }

    pending.into()
}

async fn run_worker(
    worker_id: usize,
    runner: Arc<JobRunner>,
    jobs: Arc<Mutex<mpsc::Receiver<MediaItem>>>,
    results: mpsc::Sender<DownloadResult>,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let next = {
            let mut rx = jobs.lock().await;
            tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                item = rx.recv() => item,
            }
        };
        let Some(item) = next else {
            break;
        };

        let result = runner.run(item, &cancel).await;
        if results.send(result).await.is_err() {
            break;
        }
    }
    debug!(worker_id, "worker exiting");
}

/// What every worker needs to run one job.
#[derive(Debug)]
struct JobRunner {
    client: HttpClient,
    retry_policy: RetryPolicy,
    output_dir: PathBuf,
    file_base: String,
}

impl JobRunner {
    #[instrument(skip(self, item, cancel), fields(url = %item.url, filename = %item.filename))]
    async fn run(&self, item: MediaItem, cancel: &CancellationToken) -> DownloadResult {
        let path = self.output_dir.join(&item.filename);

        if let Some(size) = existing_size(&path).await {
            debug!(size, "destination already exists, skipping");
            return DownloadResult {
                item,
                outcome: DownloadOutcome::Skipped { size },
                attempts: 0,
            };
        }

        let url = resolve_url(&item.url, &self.file_base);
        let (outcome, attempts) = self.fetch_with_retry(&url, &path, cancel).await;

        match &outcome {
            DownloadOutcome::Failed(e) => warn!(attempts, error = %e, "download failed"),
            _ => debug!(attempts, "download succeeded"),
        }

        DownloadResult {
            item,
            outcome,
            attempts,
        }
    }

    /// Runs attempts until one succeeds, the policy gives up, or cancellation.
    async fn fetch_with_retry(
        &self,
        url: &str,
        path: &Path,
        cancel: &CancellationToken,
    ) -> (DownloadOutcome, u32) {
        let mut errors = AttemptErrors::default();
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return (DownloadOutcome::Failed(DownloadError::cancelled(url)), attempt);
            }
            attempt += 1;
            debug!(attempt, "attempting download");

            let error = match self.client.fetch_to_file(url, path, cancel).await {
                Ok(size) => return (DownloadOutcome::Success { size }, attempt),
                Err(e) if e.is_cancelled() => return (DownloadOutcome::Failed(e), attempt),
                Err(e) => e,
            };

            let decision = self.retry_policy.should_retry(classify_error(&error), attempt);
            match decision {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        url,
                        attempt = next_attempt,
                        max_attempts = self.retry_policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying download"
                    );
                    errors.push(attempt, error);
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            let cancelled = DownloadError::cancelled(url);
                            return (DownloadOutcome::Failed(cancelled), attempt);
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url, %reason, "not retrying download");
                    errors.push(attempt, error);
                    let failed = DownloadError::AttemptsFailed {
                        url: url.to_string(),
                        errors,
                    };
                    return (DownloadOutcome::Failed(failed), attempt);
                }
            }
        }
    }
}

/// Size of a non-empty regular file at `path`.
async fn existing_size(path: &Path) -> Option<u64> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    (metadata.is_file() && metadata.len() > 0).then(|| metadata.len())
}

/// Turns a media `src` into an absolute URL.
///
/// `http://` and `https://` URLs (any case) pass through unchanged,
/// protocol-relative `//host/x` gets `https:`, and anything else is joined
/// onto `file_base` with exactly one `/` between them.
///
/// # Example
///
/// ```
/// use tele_dl::download::resolve_url;
///
/// assert_eq!(resolve_url("/file/a.jpg", "https://telegra.ph/"), "https://telegra.ph/file/a.jpg");
/// assert_eq!(resolve_url("//cdn.example/a.jpg", "https://telegra.ph"), "https://cdn.example/a.jpg");
/// ```
#[must_use]
pub fn resolve_url(url: &str, file_base: &str) -> String {
    if has_prefix_ignore_case(url, "http://") || has_prefix_ignore_case(url, "https://") {
        return url.to_string();
    }
    if let Some(rest) = url.strip_prefix("//") {
        return format!("https://{rest}");
    }
    format!(
        "{}/{}",
        file_base.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

fn has_prefix_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
