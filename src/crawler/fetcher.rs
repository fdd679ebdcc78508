//! Document fetching
//!
//! This module defines the `Downloader` capability the pipeline fetches
//! through, and its default HTTP implementation:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with bounded redirects
//! - Error classification into per-URL failures

use crate::config::Config;
use crate::CrawlError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// A downloaded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The URL that was requested
    pub url: String,

    /// The URL the content was served from, after redirects
    pub final_url: String,

    /// Content-Type header value, if any
    pub content_type: Option<String>,

    /// Document body
    pub body: String,
}

impl Document {
    /// Creates a document served directly from `url` without a content type
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            content_type: None,
            body: body.into(),
        }
    }

    /// Returns true if the content type is missing or declares HTML
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
            .unwrap_or(true)
    }
}

/// Fetches documents by URL
///
/// Implementations may take arbitrary time. Errors are opaque to the
/// pipeline and are reported verbatim in the crawl result.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Downloads the document at `url`
    async fn download(&self, url: &str) -> Result<Document, CrawlError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration (user agent and timeouts)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .connect_timeout(Duration::from_secs(config.http.connect_timeout_secs))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Downloader backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    /// Creates a downloader with a client built from `config`
    pub fn new(config: &Config) -> Result<Self, CrawlError> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str) -> Result<Document, CrawlError> {
        fetch_url(&self.client, url).await
    }
}

/// Fetches a URL and classifies any failure
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | `Ok(Document)` |
/// | Other status | `CrawlError::Status` |
/// | Timeout | `CrawlError::Timeout` |
/// | Anything else | `CrawlError::Http` |
pub async fn fetch_url(client: &Client, url: &str) -> Result<Document, CrawlError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        tracing::debug!("{} returned {}", url, status);
        return Err(CrawlError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = response.text().await.map_err(|e| classify_error(url, e))?;

    Ok(Document {
        url: url.to_string(),
        final_url,
        content_type,
        body,
    })
}

fn classify_error(url: &str, error: reqwest::Error) -> CrawlError {
    if error.is_timeout() {
        CrawlError::Timeout {
            url: url.to_string(),
        }
    } else {
        CrawlError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
