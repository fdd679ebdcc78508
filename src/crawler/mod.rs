//! Crawler module
//!
//! This module contains the crawl pipeline:
//! - The `Downloader` and `LinkExtractor` capabilities and their HTTP/HTML defaults
//! - Fixed-size worker pools for the download and extract stages
//! - Download and extract tasks
//! - Crawl orchestration and completion detection

mod coordinator;
mod fetcher;
mod parser;
mod pipeline;
mod pool;
mod tasks;

pub use coordinator::{CrawlResult, Crawler, ROOT_DEPTH};
pub use fetcher::{build_http_client, fetch_url, Document, Downloader, HttpDownloader};
pub use parser::{parse_html, HtmlLinkExtractor, LinkExtractor, ParsedPage};
pub use pipeline::Pipeline;
pub use pool::WorkerPool;
pub use tasks::{CrawlContext, DownloadTask, ExtractTask};
