//! Retry logic with linear backoff for failed media downloads.
//!
//! This module provides the [`RetryPolicy`] and [`FailureType`] types for
//! classifying download errors and determining retry behavior.
//!
//! # Overview
//!
//! When an attempt fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - anything that might succeed next time
//! - [`FailureType::NotFound`] - the resource does not exist (404/410)
//! - [`FailureType::Cancelled`] - the run was cancelled
//!
//! The [`RetryPolicy`] then decides whether another attempt is made and how
//! long to wait first. The wait is linear in the attempt number that just
//! failed: one backoff unit after attempt 1, two after attempt 2, and so on.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tele_dl::download::{DownloadError, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::new(2, Duration::from_secs(1));
//! let error = DownloadError::http_status("https://telegra.ph/file/a.jpg", 503);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(delay, Duration::from_secs(1));
//!         assert_eq!(attempt, 2);
//!     }
//!     RetryDecision::DoNotRetry { reason } => unreachable!("{reason}"),
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::DownloadError;

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 3;

/// Default backoff unit (1 second).
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Classification of download failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary or unknown failure that may succeed on retry.
    ///
    /// Examples: network errors, timeouts, 5xx and most 4xx responses, IO errors.
    Transient,

    /// The resource does not exist. Retrying would not help.
    NotFound,

    /// The run was cancelled. No further attempts may start.
    Cancelled,
}

/// Decision on whether to retry a failed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the download after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the download.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Retry budget and backoff unit.
///
/// # Default Values
///
/// - `retries`: 3 (so 4 attempts in total)
/// - `backoff_unit`: 1 second
///
/// # Delay Calculation
///
/// ```text
/// delay = backoff_unit * failed_attempt
/// ```
///
/// With defaults, delays are 1s, 2s, 3s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    retries: u32,

    /// Wait per failed attempt number.
    backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy allowing `retries` extra attempts with the given backoff unit.
    #[must_use]
    pub fn new(retries: u32, backoff_unit: Duration) -> Self {
        Self {
            retries,
            backoff_unit,
        }
    }

    /// Creates a policy with a custom retry count and the default backoff unit.
    #[must_use]
    pub fn with_retries(retries: u32) -> Self {
        Self {
            retries,
            ..Self::default()
        }
    }

    /// Extra attempts after the first.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Total attempts allowed, `retries + 1`.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// The configured backoff unit.
    #[must_use]
    pub fn backoff_unit(&self) -> Duration {
        self.backoff_unit
    }

    /// Wait inserted after `attempt` fails.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }

    /// Determines whether to retry a failed download.
    ///
    /// # Arguments
    ///
    /// * `failure_type` - Classification of the failure
    /// * `attempt` - The attempt number that just failed (1-indexed)
    #[instrument(skip(self), fields(max_attempts = self.max_attempts()))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::NotFound => {
                return RetryDecision::DoNotRetry {
                    reason: "resource not found - retry would not help".to_string(),
                };
            }
            FailureType::Cancelled => {
                return RetryDecision::DoNotRetry {
                    reason: "download cancelled".to_string(),
                };
            }
            FailureType::Transient => {}
        }

        if attempt >= self.max_attempts() {
            debug!(attempt, max = self.max_attempts(), "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts()),
            };
        }

        let delay = self.backoff_for(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }
}

/// Classifies a download error into a failure type for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | HTTP 404, 410 | NotFound |
/// | Cancelled | Cancelled |
/// | everything else | Transient |
#[instrument(level = "trace")]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { status, .. } if is_not_found_status(*status) => {
            FailureType::NotFound
        }
        DownloadError::Cancelled { .. } => FailureType::Cancelled,
        _ => FailureType::Transient,
    }
}

fn is_not_found_status(status: u16) -> bool {
    matches!(status, 404 | 410)
}
