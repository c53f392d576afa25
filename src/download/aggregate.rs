//! Per-job results and the aggregator that folds them into run statistics.

use std::time::{Duration, Instant};

use tracing::debug;

use super::DownloadError;
use crate::extract::MediaItem;

/// How a single job ended.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The file was fetched and fully written.
    Success {
        /// Bytes written to disk.
        size: u64,
    },
    /// A non-empty file already existed at the destination.
    Skipped {
        /// Size of the pre-existing file.
        size: u64,
    },
    /// The job did not produce a file.
    Failed(DownloadError),
}

impl DownloadOutcome {
    /// Returns `true` for [`DownloadOutcome::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&DownloadError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// The one result every job yields.
#[derive(Debug)]
pub struct DownloadResult {
    /// The job this result belongs to.
    pub item: MediaItem,
    /// What happened.
    pub outcome: DownloadOutcome,
    /// Attempts started; 0 when the job was skipped or never dispatched.
    pub attempts: u32,
}

impl DownloadResult {
    /// Builds a result for a job that never left the queue.
    #[must_use]
    pub fn cancelled(item: MediaItem) -> Self {
        let error = DownloadError::cancelled(item.url.clone());
        Self {
            item,
            outcome: DownloadOutcome::Failed(error),
            attempts: 0,
        }
    }
}

/// Statistics for one `download_all` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Results drained.
    pub total: usize,
    /// Jobs that wrote a file.
    pub successful: usize,
    /// Jobs that failed, cancelled ones included.
    pub failed: usize,
    /// Jobs satisfied by an existing file.
    pub skipped: usize,
    /// Backoff-then-retry transitions across all jobs.
    pub retried: usize,
    /// Sum of bytes written by successful jobs.
    pub total_size: u64,
    /// Wall time from dispatch to the last drained result.
    pub duration: Duration,
}

impl DownloadStats {
    /// Returns `true` when at least one job failed and at least one did not.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.failed > 0 && self.failed < self.total
    }
}

/// Single-owner accumulator for the result stream.
///
/// Only the coordinator touches it, so counters are plain integers.
#[derive(Debug)]
pub struct ResultAggregator {
    stats: DownloadStats,
    results: Vec<DownloadResult>,
    started: Instant,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    /// Starts the clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Starts the clock with room for `capacity` results.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stats: DownloadStats::default(),
            results: Vec::with_capacity(capacity),
            started: Instant::now(),
        }
    }

    /// Folds one result in and returns the number drained so far.
    pub fn record(&mut self, result: DownloadResult) -> usize {
        match &result.outcome {
            DownloadOutcome::Success { size } => {
                self.stats.successful += 1;
                self.stats.total_size += size;
            }
            DownloadOutcome::Skipped { .. } => self.stats.skipped += 1,
            DownloadOutcome::Failed(_) => self.stats.failed += 1,
        }
        self.stats.retried += result.attempts.saturating_sub(1) as usize;
        self.stats.total += 1;
        self.results.push(result);
        self.stats.total
    }

    /// Results drained so far.
    #[must_use]
    pub fn drained(&self) -> usize {
        self.stats.total
    }

    /// Stamps the duration and hands back stats plus results in completion order.
    #[must_use]
    pub fn finish(mut self) -> (DownloadStats, Vec<DownloadResult>) {
        self.stats.duration = self.started.elapsed();
        debug!(
            total = self.stats.total,
            successful = self.stats.successful,
            failed = self.stats.failed,
            skipped = self.stats.skipped,
            "aggregation finished"
        );
        (self.stats, self.results)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn result(n: usize, outcome: DownloadOutcome, attempts: u32) -> DownloadResult {
        DownloadResult {
            item: MediaItem::new(format!("https://a/{n}.jpg"), format!("{n}_{n}.jpg")),
            outcome,
            attempts,
        }
    }

    #[test]
    fn test_each_result_counts_exactly_once() {
        let mut aggregator = ResultAggregator::new();

        assert_eq!(aggregator.record(result(0, DownloadOutcome::Success { size: 10 }, 1)), 1);
        assert_eq!(aggregator.record(result(1, DownloadOutcome::Skipped { size: 1024 }, 0)), 2);
        assert_eq!(
            aggregator.record(result(
                2,
                DownloadOutcome::Failed(DownloadError::http_status("u", 404)),
                1
            )),
            3
        );
        assert_eq!(aggregator.record(result(3, DownloadOutcome::Success { size: 5 }, 3)), 4);

        let (stats, results) = aggregator.finish();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.retried, 2);
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn test_total_size_counts_successes_only() {
        let mut aggregator = ResultAggregator::new();
        aggregator.record(result(0, DownloadOutcome::Success { size: 100 }, 1));
        aggregator.record(result(1, DownloadOutcome::Skipped { size: 9999 }, 0));

        let (stats, _) = aggregator.finish();
        assert_eq!(stats.total_size, 100);
    }

    #[test]
    fn test_results_keep_completion_order() {
        let mut aggregator = ResultAggregator::with_capacity(3);
        for n in [2, 0, 1] {
            aggregator.record(result(n, DownloadOutcome::Success { size: 1 }, 1));
        }

        let (_, results) = aggregator.finish();
        let order: Vec<&str> = results.iter().map(|r| r.item.filename.as_str()).collect();
        assert_eq!(order, ["2_2.jpg", "0_0.jpg", "1_1.jpg"]);
    }

    #[test]
    fn test_cancelled_result_has_no_attempts() {
        let cancelled = DownloadResult::cancelled(MediaItem::new("u", "0_u.jpg"));
        assert_eq!(cancelled.attempts, 0);
        assert!(cancelled.outcome.error().unwrap().is_cancelled());
    }

    #[test]
    fn test_is_partial() {
        let stats = DownloadStats {
            total: 3,
            failed: 1,
            ..DownloadStats::default()
        };
        assert!(stats.is_partial());
        assert!(!DownloadStats { failed: 3, ..stats.clone() }.is_partial());
        assert!(!DownloadStats { failed: 0, ..stats }.is_partial());
    }
}
