//! Terminal states of a download attempt

use std::fmt;

/// How a download task ended
///
/// A download task ends in exactly one of these states. `Requeued` ends the
/// task but not the URL: a successor task carries the claim forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadState {
    /// Another task already claimed the URL
    Dropped,

    /// The host was at capacity; a successor task was queued
    Requeued,

    /// Fetched and handed to the extract stage
    Expanded,

    /// Fetched at the depth limit, no extraction
    Leaf,

    /// Fetching failed, or the URL had no usable host
    Failed,

    /// The pipeline was shut down before the URL could be fetched
    Rejected,
}

impl DownloadState {
    /// Short lowercase name, used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dropped => "dropped",
            Self::Requeued => "requeued",
            Self::Expanded => "expanded",
            Self::Leaf => "leaf",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
