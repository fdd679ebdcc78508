//! Pipeline controller
//!
//! Owns the two worker pools (download stage, extract stage) and the
//! capabilities they run. One pipeline serves every crawl started by its
//! `Crawler`; per-crawl state travels with the tasks.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{Document, Downloader};
use crate::crawler::parser::LinkExtractor;
use crate::crawler::pool::WorkerPool;
use crate::crawler::tasks::{DownloadTask, ExtractTask};
use crate::CrawlError;
use std::sync::Arc;
use std::time::Duration;

/// The download and extract stages plus their capabilities
pub struct Pipeline {
    downloads: WorkerPool<DownloadTask>,
    extracts: WorkerPool<ExtractTask>,
    downloader: Arc<dyn Downloader>,
    extractor: Arc<dyn LinkExtractor>,
    per_host: usize,
    requeue_backoff: Duration,
}

impl Pipeline {
    /// Starts both pools
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: &CrawlerConfig,
        downloader: Arc<dyn Downloader>,
        extractor: Arc<dyn LinkExtractor>,
    ) -> Self {
        Self {
            downloads: WorkerPool::new("download", config.downloads, DownloadTask::run),
            extracts: WorkerPool::new("extract", config.extractors, ExtractTask::run),
            downloader,
            extractor,
            per_host: config.per_host,
            requeue_backoff: config.requeue_backoff(),
        }
    }

    /// Queues a download task
    ///
    /// If the pool is shut down the task is rejected: a task that already
    /// holds its URL's claim records `CrawlError::PoolClosed` for it, and the
    /// task's pending count is released either way.
    pub fn submit_download(&self, task: DownloadTask) -> Result<(), CrawlError> {
        self.downloads.submit(task).map_err(|task| {
            task.reject();
            CrawlError::PoolClosed { pool: "download" }
        })
    }

    /// Queues an extract task; a rejected task is dropped
    pub fn submit_extract(&self, task: ExtractTask) -> Result<(), CrawlError> {
        self.extracts.submit(task).map_err(|task| {
            tracing::debug!("Extract pool closed, dropping links of {}", task.url());
            CrawlError::PoolClosed { pool: "extract" }
        })
    }

    /// Fetches a document through the downloader
    ///
    /// The download runs in its own task, so a panicking downloader fails
    /// only this URL with a `CrawlError::Fetch`.
    pub async fn fetch(&self, url: &str) -> Result<Document, CrawlError> {
        let downloader = Arc::clone(&self.downloader);
        let target = url.to_string();

        tokio::spawn(async move { downloader.download(&target).await })
            .await
            .map_err(|e| CrawlError::Fetch {
                url: url.to_string(),
                message: if e.is_panic() {
                    "panicked".to_string()
                } else {
                    e.to_string()
                },
            })?
    }

    /// Runs the link extractor on the blocking thread pool
    pub async fn extract_links(&self, document: Document) -> Result<Vec<String>, CrawlError> {
        let extractor = Arc::clone(&self.extractor);
        let url = document.url.clone();

        tokio::task::spawn_blocking(move || extractor.extract_links(&document))
            .await
            .map_err(|e| CrawlError::Extract {
                url,
                message: e.to_string(),
            })?
    }

    /// Concurrent fetch slots per host
    pub fn per_host(&self) -> usize {
        self.per_host
    }

    /// Delay before a task turned away by a busy host is queued again
    pub fn requeue_backoff(&self) -> Duration {
        self.requeue_backoff
    }

    /// Stops both pools from accepting work; queued and running tasks drain
    pub fn shutdown(&self) {
        let downloads = self.downloads.shutdown();
        let extracts = self.extracts.shutdown();
        if downloads || extracts {
            tracing::info!("Pipeline shut down, draining queued work");
        }
    }

    /// Returns true once `shutdown` has been called
    pub fn is_shut_down(&self) -> bool {
        self.downloads.is_shut_down() && self.extracts.is_shut_down()
    }

    /// Waits until both pools have drained after `shutdown`
    pub async fn join(&self) {
        self.downloads.join().await;
        self.extracts.join().await;
    }
}
