//! HTTP client for the Telegraph `getPage` API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::error::FetchError;
use super::{Page, parse_content};
use crate::download::USER_AGENT;

/// Default API endpoint; the page path is appended to it.
pub const DEFAULT_API_BASE: &str = "https://api.telegra.ph/getPage/";

/// Hosts that serve Telegraph pages.
const PAGE_HOSTS: &[&str] = &["telegra.ph", "www.telegra.ph"];

/// Source of page content trees.
///
/// The run pipeline only needs the parsed tree, so tests and alternative
/// backends plug in here instead of standing up an HTTP server.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches the page at `path` (the part after `https://telegra.ph/`).
    async fn fetch_page(&self, path: &str) -> Result<Page, FetchError>;
}

/// Telegraph API client.
#[derive(Debug, Clone)]
pub struct TelegraphClient {
    client: Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<ApiPage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    path: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    content: Option<serde_json::Value>,
}

impl TelegraphClient {
    /// Creates a client for `api_base` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the underlying HTTP client cannot be created.
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.into(),
        })
    }

    /// Returns the configured API base.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn page_url(&self, path: &str) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{base}/{path}?return_content=true")
    }
}

#[async_trait]
impl PageSource for TelegraphClient {
    #[instrument(skip(self))]
    async fn fetch_page(&self, path: &str) -> Result<Page, FetchError> {
        let url = self.page_url(path);
        debug!(url = %url, "fetching page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::network(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(&url, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(&url, e))?;
        let decoded = decode_response(&body).map_err(|e| FetchError::decode(&url, e))?;

        if !decoded.ok {
            return Err(FetchError::Api {
                message: decoded.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        let Some(result) = decoded.result else {
            return Err(FetchError::Api {
                message: "response has no result".to_string(),
            });
        };

        let nodes = match result.content {
            Some(content) => parse_content(content).map_err(|e| FetchError::decode(&url, e))?,
            None => Vec::new(),
        };
        debug!(title = %result.title, root_nodes = nodes.len(), "page fetched");

        Ok(Page {
            path: result.path,
            url: result.url,
            title: result.title,
            author_name: result.author_name,
            description: result.description.filter(|d| !d.is_empty()),
            nodes,
        })
    }
}

/// Decodes an API response with no nesting limit, growing the stack on demand.
fn decode_response(body: &[u8]) -> Result<ApiResponse, serde_json::Error> {
    let mut json = serde_json::Deserializer::from_slice(body);
    json.disable_recursion_limit();
    let decoded = ApiResponse::deserialize(serde_stacker::Deserializer::new(&mut json))?;
    json.end()?;
    Ok(decoded)
}

/// Extracts the page path from a Telegraph page URL.
///
/// Query strings and fragments are ignored.
///
/// # Errors
///
/// Returns [`FetchError::InvalidPageUrl`] when `url` is not an http(s) URL on
/// a Telegraph host or has no page path.
///
/// # Examples
///
/// ```
/// use tele_dl::page::extract_page_path;
///
/// assert_eq!(extract_page_path("https://telegra.ph/My-Page-01-01").unwrap(), "My-Page-01-01");
/// assert!(extract_page_path("https://example.com/My-Page").is_err());
/// ```
pub fn extract_page_path(url: &str) -> Result<String, FetchError> {
    let parsed = Url::parse(url.trim()).map_err(|_| FetchError::invalid_page_url(url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::invalid_page_url(url));
    }
    let host = parsed.host_str().unwrap_or_default();
    if !PAGE_HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h)) {
        return Err(FetchError::invalid_page_url(url));
    }
    let path = parsed.path().trim_matches('/');
    if path.is_empty() {
        return Err(FetchError::invalid_page_url(url));
    }
    Ok(path.to_string())
}
