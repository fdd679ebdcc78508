//! Download and extract tasks
//!
//! Together these implement the recursive download → extract → download
//! cycle. Every task owns a `PendingTask` guard taken when it is created,
//! so the crawl's tracker counts it from before it is queued until the
//! moment it is dropped.

use crate::crawler::fetcher::Document;
use crate::crawler::pipeline::Pipeline;
use crate::state::{CompletionTracker, DownloadState, Frontier, HostAdmission, PendingTask};
use crate::url::extract_host;
use crate::CrawlError;
use std::sync::Arc;

/// Shared state of one crawl invocation
///
/// Created fresh for every crawl and passed to every task of it, so separate
/// crawls never share a frontier, admission table or tracker.
pub struct CrawlContext {
    pub frontier: Frontier,
    pub hosts: HostAdmission,
    pub tracker: Arc<CompletionTracker>,
    pub max_depth: u32,
    pub pipeline: Arc<Pipeline>,
}

impl CrawlContext {
    pub fn new(pipeline: Arc<Pipeline>, max_depth: u32) -> Self {
        Self {
            frontier: Frontier::new(),
            hosts: HostAdmission::new(pipeline.per_host()),
            tracker: Arc::new(CompletionTracker::new()),
            max_depth,
            pipeline,
        }
    }
}

/// Downloads one URL
pub struct DownloadTask {
    url: String,
    depth: u32,
    /// Set on requeued tasks, which inherit the claim of their predecessor
    claimed: bool,
    ctx: Arc<CrawlContext>,
    _pending: PendingTask,
}

impl DownloadTask {
    /// Creates a task for a newly discovered URL and registers it as pending
    pub fn new(ctx: &Arc<CrawlContext>, url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
            claimed: false,
            ctx: Arc::clone(ctx),
            _pending: ctx.tracker.track(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Pool entry point
    pub async fn run(self) {
        let url = self.url.clone();
        let depth = self.depth;
        let state = self.execute().await;
        tracing::debug!("Download {} at depth {}: {}", url, depth, state);
    }

    /// Runs the task and reports how it ended
    pub async fn execute(self) -> DownloadState {
        let ctx = Arc::clone(&self.ctx);

        if !self.claimed && !ctx.frontier.claim_if_new(&self.url) {
            return DownloadState::Dropped;
        }

        let host = match extract_host(&self.url) {
            Ok(host) => host,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", self.url, e);
                ctx.frontier.record_error(&self.url, e.into());
                return DownloadState::Failed;
            }
        };

        let Some(permit) = ctx.hosts.try_claim(&host) else {
            tracing::trace!("Host {} at capacity, requeueing {}", host, self.url);
            self.requeue();
            return DownloadState::Requeued;
        };

        let fetched = ctx.pipeline.fetch(&self.url).await;
        permit.release();

        let document = match fetched {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Failed to download {}: {}", self.url, e);
                ctx.frontier.record_error(&self.url, e);
                return DownloadState::Failed;
            }
        };
        ctx.frontier.record_success(&self.url);

        if self.depth >= ctx.max_depth {
            return DownloadState::Leaf;
        }

        let task = ExtractTask::new(&ctx, document, self.depth);
        // A closed extract pool leaves this URL downloaded but unexpanded
        let _ = ctx.pipeline.submit_extract(task);
        DownloadState::Expanded
    }

    /// Queues a successor for the same URL and depth that keeps the claim
    ///
    /// The successor is registered before this task's guard is dropped, so
    /// the pending count never passes through zero in between.
    fn requeue(&self) {
        let successor = Self {
            url: self.url.clone(),
            depth: self.depth,
            claimed: true,
            ctx: Arc::clone(&self.ctx),
            _pending: self.ctx.tracker.track(),
        };

        let backoff = self.ctx.pipeline.requeue_backoff();
        if backoff.is_zero() {
            let _ = self.ctx.pipeline.submit_download(successor);
            return;
        }

        // The delay runs off-pool so no worker sits idle waiting on it
        tokio::spawn(async move {
            tokio::time::sleep(backoff).await;
            let pipeline = Arc::clone(&successor.ctx.pipeline);
            let _ = pipeline.submit_download(successor);
        });
    }

    /// Settles a task the download pool refused
    pub(crate) fn reject(self) {
        if self.claimed {
            self.ctx.frontier.record_error(
                &self.url,
                CrawlError::PoolClosed { pool: "download" },
            );
        }
        tracing::debug!(
            "Download {} at depth {}: {}",
            self.url,
            self.depth,
            DownloadState::Rejected
        );
    }
}

/// Expands a downloaded document into download tasks for its links
pub struct ExtractTask {
    document: Document,
    /// Depth of the download that produced the document
    depth: u32,
    ctx: Arc<CrawlContext>,
    _pending: PendingTask,
}

impl ExtractTask {
    pub fn new(ctx: &Arc<CrawlContext>, document: Document, depth: u32) -> Self {
        Self {
            document,
            depth,
            ctx: Arc::clone(ctx),
            _pending: ctx.tracker.track(),
        }
    }

    pub fn url(&self) -> &str {
        &self.document.url
    }

    /// Pool entry point
    pub async fn run(self) {
        let url = self.document.url.clone();
        let submitted = self.execute().await;
        tracing::debug!("Extracted {} links from {}", submitted, url);
    }

    /// Runs the extractor and queues a download per link at the next depth
    ///
    /// Returns the number of download tasks queued. Extraction failures are
    /// logged and yield zero; they never mark the parent URL as failed.
    pub async fn execute(self) -> usize {
        let ExtractTask {
            document,
            depth,
            ctx,
            _pending: pending,
        } = self;
        let url = document.url.clone();

        let links = match ctx.pipeline.extract_links(document).await {
            Ok(links) => links,
            Err(e) => {
                tracing::debug!("Link extraction failed for {}: {}", url, e);
                return 0;
            }
        };

        let mut submitted = 0;
        for link in links {
            let task = DownloadTask::new(&ctx, link, depth + 1);
            if ctx.pipeline.submit_download(task).is_ok() {
                submitted += 1;
            }
        }

        drop(pending);
        submitted
    }
}
