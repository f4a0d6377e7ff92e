//! Queue event handler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::events::QueueEvent;
use super::filter::{Admission, QueueFilter};
use super::watcher::QueueWatcher;
use crate::error::WatcherError;
use crate::queue::WorkQueue;
use crate::{Error, Result};

/// Statistics for file watching.
#[derive(Debug, Default)]
pub struct WatcherStats {
    pub files_detected: AtomicU64,
    pub files_queued: AtomicU64,
    pub files_ignored: AtomicU64,
    pub duplicates: AtomicU64,
    pub errors: AtomicU64,
}

impl WatcherStats {
    /// Create new stats tracker.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> WatcherStatsSnapshot {
        WatcherStatsSnapshot {
            files_detected: self.files_detected.load(Ordering::Relaxed),
            files_queued: self.files_queued.load(Ordering::Relaxed),
            files_ignored: self.files_ignored.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of watcher stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherStatsSnapshot {
    pub files_detected: u64,
    pub files_queued: u64,
    pub files_ignored: u64,
    pub duplicates: u64,
    pub errors: u64,
}

/// Event handler that filters arrivals and feeds the work queue.
#[derive(Debug)]
pub struct EventHandler {
    queue: WorkQueue,
    stats: Arc<WatcherStats>,
}

impl EventHandler {
    /// Create a new event handler.
    #[must_use]
    pub const fn new(queue: WorkQueue, stats: Arc<WatcherStats>) -> Self {
        Self { queue, stats }
    }

    /// Handle one event.
    ///
    /// Vanished paths, directories and hidden files are expected races with
    /// other writers and are dropped quietly. A path that is removed or found
    /// missing is no longer tracked, so a new file under that name is queued.
    ///
    /// # Errors
    ///
    /// Returns `WatcherError::QueueClosed` if the worker is gone.
    pub fn handle(&self, event: QueueEvent) -> Result<()> {
        let path = match event {
            QueueEvent::Arrived(path) => path,
            QueueEvent::Removed(path) => {
                if self.queue.forget(&path) {
                    tracing::debug!(path = %path.display(), "Left queue, no longer tracked");
                }
                return Ok(());
            }
            QueueEvent::Error(reason) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %reason, "Watch error");
                return Ok(());
            }
        };

        self.stats.files_detected.fetch_add(1, Ordering::Relaxed);

        match QueueFilter::classify(&path) {
            Admission::Accept => {}
            Admission::Missing => {
                self.queue.forget(&path);
                self.stats.files_ignored.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(path = %path.display(), "Ignoring vanished path");
                return Ok(());
            }
            admission => {
                self.stats.files_ignored.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(path = %path.display(), ?admission, "Ignoring event");
                return Ok(());
            }
        }

        if self.queue.enqueue(path.clone())? {
            self.stats.files_queued.fetch_add(1, Ordering::Relaxed);
            tracing::info!(path = %path.display(), "Queued");
        } else {
            self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Drain `watcher` until cancelled, the backend stops, or the queue closes.
    ///
    /// # Errors
    ///
    /// Returns an error if an event cannot be handled. A closed queue ends
    /// the loop without error.
    pub async fn run(self, mut watcher: QueueWatcher, cancel: CancellationToken) -> Result<()> {
        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = watcher.recv() => event,
            };

            let Some(event) = event else {
                tracing::warn!(path = %watcher.dir().display(), "Watcher stopped");
                break;
            };

            match self.handle(event) {
                Ok(()) => {}
                Err(Error::Watcher(WatcherError::QueueClosed)) => {
                    tracing::debug!("Work queue closed, stopping event handler");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let snapshot = self.stats.snapshot();
        tracing::debug!(
            detected = snapshot.files_detected,
            queued = snapshot.files_queued,
            ignored = snapshot.files_ignored,
            duplicates = snapshot.duplicates,
            errors = snapshot.errors,
            "Event handler stopped"
        );
        Ok(())
    }

    /// Get current stats.
    #[must_use]
    pub fn stats(&self) -> Arc<WatcherStats> {
        Arc::clone(&self.stats)
    }
}
