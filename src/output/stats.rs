//! Statistics derived from a crawl result
//!
//! This module summarizes a `CrawlResult` for display: how many URLs were
//! downloaded or failed, how many hosts were touched, and which kinds of
//! errors occurred.

use crate::crawler::CrawlResult;
use crate::url::extract_host;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    /// Number of URLs downloaded successfully
    pub downloaded: usize,

    /// Number of URLs that failed
    pub failed: usize,

    /// Number of distinct hosts among all attempted URLs
    pub unique_hosts: usize,

    /// Failure count per error kind
    pub errors_by_kind: BTreeMap<&'static str, usize>,

    /// Whether the crawl was cut short
    pub interrupted: bool,

    /// Crawl duration
    pub elapsed: Duration,
}

impl CrawlStatistics {
    /// Computes statistics for a crawl result
    pub fn from_result(result: &CrawlResult) -> Self {
        let hosts: BTreeSet<String> = result
            .downloaded
            .iter()
            .chain(result.errors.keys())
            .filter_map(|url| extract_host(url).ok())
            .collect();

        let mut errors_by_kind = BTreeMap::new();
        for error in result.errors.values() {
            *errors_by_kind.entry(error.kind()).or_insert(0) += 1;
        }

        Self {
            downloaded: result.downloaded.len(),
            failed: result.errors.len(),
            unique_hosts: hosts.len(),
            errors_by_kind,
            interrupted: result.interrupted,
            elapsed: result.elapsed,
        }
    }

    /// Total URLs attempted
    pub fn attempted(&self) -> usize {
        self.downloaded + self.failed
    }

    /// Downloads per second over the whole crawl
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.downloaded as f64 / secs
        } else {
            0.0
        }
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  URLs attempted: {}", stats.attempted());
    println!("  Downloaded: {}", stats.downloaded);
    println!("  Failed: {}", stats.failed);
    println!("  Unique hosts: {}", stats.unique_hosts);
    println!(
        "  Duration: {:.2}s ({:.2} pages/sec)",
        stats.elapsed.as_secs_f64(),
        stats.rate()
    );
    if stats.interrupted {
        println!("  Status: interrupted (partial result)");
    }

    if !stats.errors_by_kind.is_empty() {
        println!("\nErrors by Kind:");
        let mut kinds: Vec<_> = stats.errors_by_kind.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (kind, count) in kinds {
            let percentage = (*count as f64 / stats.attempted() as f64) * 100.0;
            println!("  {}: {} ({:.1}%)", kind, count, percentage);
        }
    }
}
