//! Fanout-Crawler: a bounded-parallelism recursive web crawler
//!
//! This crate implements a two-stage crawl pipeline (download, then link
//! extraction) running on fixed-size worker pools, with per-host admission
//! control, URL deduplication and quiescence detection.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to extract links from {url}: {message}")]
    Extract { url: String, message: String },

    #[error("URL error: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("The {pool} pool is shut down")]
    PoolClosed { pool: &'static str },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    /// Short, stable name of the error kind, used for reporting
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Http { .. } | Self::Reqwest(_) => "http",
            Self::Status { .. } => "status",
            Self::Timeout { .. } => "timeout",
            Self::Fetch { .. } => "fetch",
            Self::Extract { .. } => "extract",
            Self::InvalidUrl(_) => "invalid_url",
            Self::PoolClosed { .. } => "pool_closed",
            Self::Io(_) => "io",
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL '{url}': {source}")]
    Parse {
        url: String,
        source: ::url::ParseError,
    },

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlResult, Crawler, Document, Downloader, LinkExtractor};
pub use state::{CompletionTracker, Frontier, HostAdmission};
pub use crate::url::extract_host;
