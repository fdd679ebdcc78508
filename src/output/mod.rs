//! Output module for reporting crawl results
//!
//! This module handles:
//! - Summarizing a crawl result into statistics
//! - Printing statistics and URL listings

pub mod stats;

pub use stats::{print_statistics, CrawlStatistics};

use crate::crawler::CrawlResult;

/// Prints every downloaded URL, then every failed URL with its error
///
/// Failed URLs are listed in sorted order so output is stable across runs.
pub fn print_urls(result: &CrawlResult) {
    println!("Downloaded:");
    for url in &result.downloaded {
        println!("  {}", url);
    }

    if !result.errors.is_empty() {
        println!("\nFailed:");
        let mut failed: Vec<_> = result.errors.iter().collect();
        failed.sort_by(|a, b| a.0.cmp(b.0));
        for (url, error) in failed {
            println!("  {} ({})", url, error);
        }
    }
}
