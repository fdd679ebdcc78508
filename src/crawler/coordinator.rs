//! Crawl orchestration
//!
//! The `Crawler` seeds the pipeline with a root URL, waits for the crawl's
//! tracker to drain, and assembles the result.

use crate::config::{self, Config};
use crate::crawler::fetcher::{Downloader, HttpDownloader};
use crate::crawler::parser::{HtmlLinkExtractor, LinkExtractor};
use crate::crawler::pipeline::Pipeline;
use crate::crawler::tasks::{CrawlContext, DownloadTask};
use crate::{ConfigError, CrawlError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Depth assigned to the root URL by `crawl`
pub const ROOT_DEPTH: u32 = 1;

/// Outcome of one crawl
#[derive(Debug)]
pub struct CrawlResult {
    /// URLs downloaded successfully, sorted
    pub downloaded: Vec<String>,

    /// URLs that were attempted and failed, with their error
    pub errors: HashMap<String, CrawlError>,

    /// True if the wait was cancelled; the result is then partial
    pub interrupted: bool,

    /// Wall time from submitting the root to assembling the result
    pub elapsed: Duration,
}

impl CrawlResult {
    /// Returns true if the crawl ran to quiescence
    pub fn is_complete(&self) -> bool {
        !self.interrupted
    }

    /// Returns the error recorded for `url`, if any
    pub fn error_for(&self, url: &str) -> Option<&CrawlError> {
        self.errors.get(url)
    }
}

/// Recursive crawler over a download stage and an extract stage
///
/// Crawls may run concurrently on one `Crawler`; each gets its own
/// frontier, admission table and tracker, and they share only the pools.
pub struct Crawler {
    pipeline: Arc<Pipeline>,
}

impl Crawler {
    /// Creates a crawler with the given capabilities
    ///
    /// Validates `config` and starts the worker pools. Must be called from
    /// within a tokio runtime.
    pub fn new(
        config: &Config,
        downloader: Arc<dyn Downloader>,
        extractor: Arc<dyn LinkExtractor>,
    ) -> Result<Self, CrawlError> {
        config::validate(config)?;

        tracing::info!(
            "Starting crawler: {} downloaders, {} extractors, {} per host",
            config.crawler.downloads,
            config.crawler.extractors,
            config.crawler.per_host
        );

        Ok(Self {
            pipeline: Arc::new(Pipeline::new(&config.crawler, downloader, extractor)),
        })
    }

    /// Creates a crawler using the HTTP downloader and HTML link extractor
    pub fn with_http(config: &Config) -> Result<Self, CrawlError> {
        let downloader = Arc::new(HttpDownloader::new(config)?);
        Self::new(config, downloader, Arc::new(HtmlLinkExtractor))
    }

    /// The underlying pipeline
    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Crawls from `url` down to `max_depth`, with `url` at depth 1
    pub async fn crawl(&self, url: &str, max_depth: u32) -> CrawlResult {
        self.crawl_from(url, ROOT_DEPTH, max_depth, None).await
    }

    /// Like `crawl`, but returns a partial result once `cancel` fires
    ///
    /// Tasks already dispatched are not stopped; they keep draining in the
    /// background until the crawler is closed or runs out of work.
    pub async fn crawl_with_cancellation(
        &self,
        url: &str,
        max_depth: u32,
        cancel: CancellationToken,
    ) -> CrawlResult {
        self.crawl_from(url, ROOT_DEPTH, max_depth, Some(cancel)).await
    }

    /// Crawls from `url` placed at `start_depth`
    ///
    /// A URL at depth `d` is expanded only if `d < max_depth`; its links are
    /// downloaded at depth `d + 1`. A `max_depth` below 1 or a `start_depth`
    /// beyond it records a `CrawlError::Config` for `url` without fetching.
    pub async fn crawl_from(
        &self,
        url: &str,
        start_depth: u32,
        max_depth: u32,
        cancel: Option<CancellationToken>,
    ) -> CrawlResult {
        let started = Instant::now();
        let ctx = Arc::new(CrawlContext::new(Arc::clone(&self.pipeline), max_depth));

        tracing::info!("Crawling {} (depth {}..={})", url, start_depth, max_depth);

        let refused = if max_depth < ROOT_DEPTH || start_depth > max_depth {
            Some(CrawlError::Config(ConfigError::Validation(format!(
                "start depth {} must not exceed max depth {}, which must be at least {}",
                start_depth, max_depth, ROOT_DEPTH
            ))))
        } else {
            let root = DownloadTask::new(&ctx, url, start_depth);
            self.pipeline.submit_download(root).err()
        };
        if let Some(e) = refused {
            tracing::warn!("Cannot crawl {}: {}", url, e);
            ctx.frontier.claim_if_new(url);
            ctx.frontier.record_error(url, e);
        }

        let interrupted = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = ctx.tracker.await_zero() => false,
                    _ = token.cancelled() => true,
                }
            }
            None => {
                ctx.tracker.await_zero().await;
                false
            }
        };

        let (downloaded, errors) = ctx.frontier.snapshot();
        let elapsed = started.elapsed();

        if interrupted {
            tracing::warn!(
                "Crawl of {} interrupted with {} tasks pending",
                url,
                ctx.tracker.pending()
            );
        }
        tracing::info!(
            "Crawl of {} finished: {} downloaded, {} failed in {:?}",
            url,
            downloaded.len(),
            errors.len(),
            elapsed
        );

        CrawlResult {
            downloaded,
            errors,
            interrupted,
            elapsed,
        }
    }

    /// Stops accepting new work; already dispatched work drains
    ///
    /// Idempotent, and safe with or without a crawl in flight.
    pub fn close(&self) {
        self.pipeline.shutdown();
    }
}

impl Drop for Crawler {
    fn drop(&mut self) {
        self.close();
    }
}
