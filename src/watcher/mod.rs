//! Queue directory intake.
//!
//! This module provides:
//! - Admission rules for queued files
//! - The startup backlog scan
//! - Non-recursive directory watching using notify-rs
//! - The handler that moves accepted arrivals onto the work queue

mod events;
mod filter;
mod handler;
mod scanner;
#[allow(clippy::module_inception)]
mod watcher;

pub use events::{is_arrival, is_removal, QueueEvent};
pub use filter::{Admission, QueueFilter};
pub use handler::{EventHandler, WatcherStats, WatcherStatsSnapshot};
pub use scanner::{scan_backlog, scan_backlog_async, ScanStats, ScanStatsSnapshot};
pub use watcher::QueueWatcher;
