//! Shared crawl state
//!
//! Everything in this module is created fresh for each crawl and shared by
//! all tasks of that crawl.
//!
//! # Components
//!
//! - `Frontier`: the set of claimed URLs and the failures recorded for them
//! - `HostAdmission`: per-host concurrent fetch slots
//! - `CompletionTracker`: pending task count with a wait-for-zero gate
//! - `DownloadState`: the terminal states of a download attempt

mod completion;
mod frontier;
mod host_admission;
mod task_state;

// Re-export main types
pub use completion::{CompletionTracker, PendingTask};
pub use frontier::Frontier;
pub use host_admission::{HostAdmission, HostPermit};
pub use task_state::DownloadState;
