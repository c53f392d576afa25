//! HTTP client wrapper for streaming media files to disk.
//!
//! This module provides the `HttpClient` struct which performs a single
//! download attempt: one GET, one file, cancellable at every await point.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::constants::{
    CONNECT_TIMEOUT, COPY_BUFFER_SIZE, DEFAULT_TIMEOUT, POOL_MAX_IDLE_PER_HOST, USER_AGENT,
};
use super::error::DownloadError;

/// HTTP client for downloading files with streaming support.
///
/// Create once and share between workers; clones share the connection pool.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use tele_dl::download::HttpClient;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let cancel = CancellationToken::new();
/// let bytes = client
///     .fetch_to_file("https://telegra.ph/file/abc.jpg", Path::new("./0_abc.jpg"), &cancel)
///     .await?;
/// println!("wrote {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with the default 30 second request timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a new HTTP client whose requests time out after `timeout`.
    ///
    /// The timeout covers the whole request, body included.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .gzip(true)
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build()?;
        Ok(Self { client })
    }

    /// Performs one GET of `url` and streams the body into `path`.
    ///
    /// The file is created (or truncated) only after a 2xx response arrives.
    /// If anything fails after that, including cancellation, the partial file
    /// is removed before the error is returned.
    ///
    /// # Returns
    ///
    /// The number of bytes written.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::Cancelled`] when `cancel` fires at any point
    /// - [`DownloadError::Timeout`] / [`DownloadError::Network`] when the request fails
    /// - [`DownloadError::HttpStatus`] for non-2xx responses
    /// - [`DownloadError::Io`] when the file cannot be created
    /// - [`DownloadError::Copy`] when the body stream or a write fails
    /// - [`DownloadError::Integrity`] when the on-disk size differs from bytes written
    #[instrument(skip(self, path, cancel), fields(path = %path.display()))]
    pub async fn fetch_to_file(
        &self,
        url: &str,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, DownloadError> {
        debug!("starting download");

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
            sent = self.client.get(url).send() => sent.map_err(|e| {
                if e.is_timeout() {
                    DownloadError::timeout(url)
                } else {
                    DownloadError::network(url, e)
                }
            })?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let file = File::create(path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;

        let result = match stream_to_file(file, response, url, path, cancel).await {
            Ok(written) => verify_size(path, written).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(bytes) => debug!(bytes, "download complete"),
            Err(_) => {
                debug!("cleaning up partial file after error");
                let _ = tokio::fs::remove_file(path).await;
            }
        }

        result
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Streams response body to file, returning bytes written.
///
/// Extracted so the caller can clean up on any error.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
            next = stream.next() => next,
        };
        let Some(chunk_result) = next else {
            break;
        };
        let chunk = chunk_result.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::copy(path, e)
            }
        })?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::copy(path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::copy(path, e))?;

    Ok(bytes_written)
}

async fn verify_size(path: &Path, written: u64) -> Result<u64, DownloadError> {
    let on_disk = tokio::fs::metadata(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?
        .len();
    if on_disk != written {
        return Err(DownloadError::Integrity {
            path: path.to_path_buf(),
            written_bytes: written,
            on_disk_bytes: on_disk,
        });
    }
    Ok(written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[test]
    fn test_http_client_default_builds() {
        let client = HttpClient::default();
        drop(client.inner().clone());
    }

    #[tokio::test]
    async fn test_fetch_to_file_writes_body() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let body = vec![7u8; 100 * 1024];
        Mock::given(method("GET"))
            .and(path("/file/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("0_a.jpg");
        let client = HttpClient::new();
        let url = format!("{}/file/a.jpg", server.uri());

        let written = client
            .fetch_to_file(&url, &target, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(std::fs::read(&target).unwrap(), body);
    }

    #[tokio::test]
    async fn test_fetch_to_file_http_error_creates_no_file() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("0_a.jpg");
        let client = HttpClient::new();

        let result = client
            .fetch_to_file(&server.uri(), &target, &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(DownloadError::HttpStatus { status: 503, .. })
        ));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_fetch_to_file_pre_cancelled_sends_nothing() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x"))
            .expect(0)
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("0_a.jpg");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = HttpClient::new()
            .fetch_to_file(&server.uri(), &target, &cancel)
            .await;

        assert!(matches!(result, Err(DownloadError::Cancelled { .. })));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_fetch_to_file_unwritable_destination_is_io_error() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x"))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("missing-dir").join("0_a.jpg");

        let result = HttpClient::new()
            .fetch_to_file(&server.uri(), &target, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(DownloadError::Io { .. })));
    }

    #[tokio::test]
    async fn test_fetch_to_file_timeout() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("slow")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("0_a.jpg");
        let client = HttpClient::with_timeout(Duration::from_millis(200)).unwrap();

        let result = client
            .fetch_to_file(&server.uri(), &target, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(DownloadError::Timeout { .. })));
        assert!(!target.exists());
    }
}
