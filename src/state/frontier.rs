use crate::CrawlError;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct FrontierInner {
    claimed: HashSet<String>,
    completed: HashSet<String>,
    errors: HashMap<String, CrawlError>,
}

/// The set of URLs claimed during one crawl, plus the failures recorded for them
///
/// A URL is claimed at most once for the lifetime of a frontier. Claiming is
/// the deduplication boundary of the whole pipeline: only the task that wins
/// the claim ever fetches the URL.
///
/// A claimed URL only counts as downloaded once its fetch has succeeded, so a
/// URL still waiting for its host stays out of a partial result.
///
/// Membership test, insertion and outcome recording all happen under one
/// lock, so an outcome can never be recorded for a URL that is not claimed.
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically claims `url` if no one has claimed it yet
    ///
    /// # Returns
    ///
    /// * `true` - The caller now owns the URL and must process it
    /// * `false` - The URL was already claimed
    pub fn claim_if_new(&self, url: &str) -> bool {
        let mut inner = self.lock();
        if inner.claimed.contains(url) {
            return false;
        }
        inner.claimed.insert(url.to_string())
    }

    /// Records a failure for a claimed URL
    ///
    /// Returns false, and records nothing, if `url` was never claimed.
    /// A later error for the same URL replaces the earlier one.
    pub fn record_error(&self, url: &str, error: CrawlError) -> bool {
        let mut inner = self.lock();
        if !inner.claimed.contains(url) {
            tracing::warn!("Refusing to record error for unclaimed URL {}", url);
            return false;
        }
        inner.errors.insert(url.to_string(), error);
        true
    }

    /// Records a successful fetch for a claimed URL
    ///
    /// Returns false, and records nothing, if `url` was never claimed.
    pub fn record_success(&self, url: &str) -> bool {
        let mut inner = self.lock();
        if !inner.claimed.contains(url) {
            tracing::warn!("Refusing to record success for unclaimed URL {}", url);
            return false;
        }
        inner.completed.insert(url.to_string());
        true
    }

    /// Returns true if `url` has been claimed
    pub fn is_claimed(&self, url: &str) -> bool {
        self.lock().claimed.contains(url)
    }

    /// Number of claimed URLs
    pub fn len(&self) -> usize {
        self.lock().claimed.len()
    }

    /// Returns true if nothing has been claimed yet
    pub fn is_empty(&self) -> bool {
        self.lock().claimed.is_empty()
    }

    /// Number of recorded failures
    pub fn error_count(&self) -> usize {
        self.lock().errors.len()
    }

    /// Takes the final result sets
    ///
    /// Returns the successfully downloaded URLs (fetched URLs without an
    /// error, sorted) and moves the error map out. Claimed URLs that were
    /// never fetched appear in neither. The claimed set itself is kept, so
    /// any work still draining in the background keeps deduplicating
    /// against it.
    pub fn snapshot(&self) -> (Vec<String>, HashMap<String, CrawlError>) {
        let mut inner = self.lock();
        let errors = std::mem::take(&mut inner.errors);
        let mut downloaded: Vec<String> = inner
            .completed
            .iter()
            .filter(|url| !errors.contains_key(*url))
            .cloned()
            .collect();
        downloaded.sort();
        (downloaded, errors)
    }
}
