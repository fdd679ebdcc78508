use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A reserved fetch slot for one host
///
/// The slot is returned when the permit is released or dropped, so every
/// successful claim is released exactly once.
#[derive(Debug)]
pub struct HostPermit {
    host: String,
    _permit: OwnedSemaphorePermit,
}

impl HostPermit {
    /// The host this slot belongs to
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the slot to the host's pool
    pub fn release(self) {
        tracing::trace!("Releasing fetch slot for {}", self.host);
    }
}

/// Per-host concurrency limiter
///
/// Each host gets a counted permit set sized to the per-host limit the
/// first time it is seen. Entries are never removed during a crawl.
///
/// Only a non-blocking claim is exposed: a worker that cannot get a slot
/// must give up its turn rather than wait, otherwise a fixed-size pool could
/// fill up with workers parked on one congested host.
#[derive(Debug)]
pub struct HostAdmission {
    per_host: usize,
    hosts: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl HostAdmission {
    /// Creates an admission table allowing `per_host` concurrent fetches per host
    pub fn new(per_host: usize) -> Self {
        Self {
            per_host,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// The configured slot count per host
    pub fn per_host(&self) -> usize {
        self.per_host
    }

    fn semaphore(&self, host: &str) -> Arc<Semaphore> {
        let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            hosts
                .entry(host.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.per_host))),
        )
    }

    /// Tries to reserve one fetch slot for `host` without waiting
    ///
    /// # Returns
    ///
    /// * `Some(HostPermit)` - A slot was reserved
    /// * `None` - The host is at capacity
    pub fn try_claim(&self, host: &str) -> Option<HostPermit> {
        // The table lock is released before touching the semaphore
        let semaphore = self.semaphore(host);
        semaphore.try_acquire_owned().ok().map(|permit| HostPermit {
            host: host.to_string(),
            _permit: permit,
        })
    }

    /// Number of slots currently held for `host`
    pub fn in_flight(&self, host: &str) -> usize {
        let hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        hosts
            .get(host)
            .map(|s| self.per_host.saturating_sub(s.available_permits()))
            .unwrap_or(0)
    }

    /// Number of distinct hosts seen so far
    pub fn host_count(&self) -> usize {
        self.hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
