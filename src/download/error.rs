//! Error types for the download module.
//!
//! Every per-job failure ends up in that job's result; none of these abort
//! the worker pool.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while downloading one media file.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Could not create or inspect the destination file.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The destination path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The body stream failed part-way through; the partial file was removed.
    #[error("failed to copy response body to {path}: {source}")]
    Copy {
        /// The destination path.
        path: PathBuf,
        /// What broke the transfer.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The file on disk does not hold the bytes that were written.
    #[error("integrity check failed for {path}: wrote {written_bytes} bytes, found {on_disk_bytes}")]
    Integrity {
        /// The destination path.
        path: PathBuf,
        /// Bytes handed to the writer.
        written_bytes: u64,
        /// Size reported by the filesystem.
        on_disk_bytes: u64,
    },

    /// The run was cancelled before this job could finish.
    #[error("download of {url} cancelled")]
    Cancelled {
        /// The URL being downloaded.
        url: String,
    },

    /// Every attempt failed; the individual errors are kept in order.
    #[error("{} attempt(s) failed for {url}: {errors}", .errors.len())]
    AttemptsFailed {
        /// The URL being downloaded.
        url: String,
        /// Per-attempt failures, attempt 1 first.
        errors: AttemptErrors,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a copy error.
    pub fn copy(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Copy {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Returns `true` for [`DownloadError::Cancelled`].
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns the per-attempt errors when this is an aggregate failure.
    #[must_use]
    pub fn attempt_errors(&self) -> Option<&AttemptErrors> {
        match self {
            Self::AttemptsFailed { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

/// One failed attempt.
#[derive(Debug)]
pub struct AttemptError {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Why the attempt failed.
    pub error: DownloadError,
}

/// Ordered per-attempt failures of a single job.
#[derive(Debug, Default)]
pub struct AttemptErrors(Vec<AttemptError>);

impl AttemptErrors {
    /// Records the failure of `attempt`.
    pub fn push(&mut self, attempt: u32, error: DownloadError) {
        self.0.push(AttemptError { attempt, error });
    }

    /// Number of recorded attempts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates attempts in order.
    pub fn iter(&self) -> std::slice::Iter<'_, AttemptError> {
        self.0.iter()
    }

    /// The most recent failure.
    #[must_use]
    pub fn last(&self) -> Option<&AttemptError> {
        self.0.last()
    }
}

impl fmt::Display for AttemptErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failed) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "attempt {}: {}", failed.attempt, failed.error)?;
        }
        Ok(())
    }
}
