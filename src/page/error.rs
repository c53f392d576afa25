//! Error types for page fetching.

use thiserror::Error;

/// Errors that can occur while fetching a page content tree.
///
/// Any of these is fatal to a run: without the tree there is nothing to download.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The input is not a Telegraph page URL.
    #[error("invalid Telegraph URL {url}: must look like https://telegra.ph/<page>")]
    InvalidPageUrl {
        /// The rejected input.
        url: String,
    },

    /// Network-level failure talking to the API.
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The API URL requested.
        url: String,
        /// The underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The API URL requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body was not the expected JSON document.
    #[error("failed to decode page response from {url}: {source}")]
    Decode {
        /// The API URL requested.
        url: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The API reported `ok: false`.
    #[error("Telegraph API returned error: {message}")]
    Api {
        /// Error string from the API, or a placeholder when none was given.
        message: String,
    },
}

impl FetchError {
    /// Creates an invalid page URL error.
    pub fn invalid_page_url(url: impl Into<String>) -> Self {
        Self::InvalidPageUrl { url: url.into() }
    }

    /// Creates a network error.
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

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_http_status_display() {
        let msg = FetchError::http_status("https://api.telegra.ph/getPage/x", 502).to_string();
        assert!(msg.contains("502"), "Expected status in: {msg}");
        assert!(msg.contains("getPage/x"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_fetch_error_api_display() {
        let msg = FetchError::Api {
            message: "PAGE_NOT_FOUND".to_string(),
        }
        .to_string();
        assert!(msg.contains("PAGE_NOT_FOUND"), "Expected API message in: {msg}");
    }
}
