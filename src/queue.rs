//! Work queue between the producers (backlog scan, watcher) and the worker.
//!
//! The channel is unbounded: a burst of arrivals never blocks the watcher, and
//! the backlog grows in memory while the single worker catches up. Nothing in
//! it survives a restart; the backlog scan rebuilds it from `queue/`.
//!
//! A path is tracked from the moment it is enqueued until it leaves `queue/`.
//! While tracked, further enqueues of the same path are dropped. This absorbs
//! the overlap between the startup scan and creation events that were already
//! in flight when the watch began, and keeps a failed input from being run
//! again by a late event. The worker releases a path with
//! [`WorkReceiver::complete`] once the input is gone; the event handler
//! releases it with [`WorkQueue::forget`] when the file is removed or moved
//! away.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::WatcherError;
use crate::Result;

type Tracked = Arc<Mutex<HashSet<PathBuf>>>;

/// Producer handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    tx: mpsc::UnboundedSender<PathBuf>,
    tracked: Tracked,
}

/// Consumer handle, owned by the worker.
#[derive(Debug)]
pub struct WorkReceiver {
    rx: mpsc::UnboundedReceiver<PathBuf>,
    tracked: Tracked,
}

impl WorkQueue {
    /// Create a connected producer/consumer pair.
    #[must_use]
    pub fn unbounded() -> (Self, WorkReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracked = Tracked::default();
        (
            Self {
                tx,
                tracked: Arc::clone(&tracked),
            },
            WorkReceiver { rx, tracked },
        )
    }

    /// Add `path` to the queue.
    ///
    /// Returns `Ok(false)` if the path is already tracked.
    ///
    /// # Errors
    ///
    /// Returns `WatcherError::QueueClosed` if the receiver has been dropped.
    pub fn enqueue(&self, path: PathBuf) -> Result<bool> {
        let mut tracked = self.tracked.lock();
        if tracked.contains(&path) {
            tracing::debug!(path = %path.display(), "Already queued, skipping");
            return Ok(false);
        }
        self.tx
            .send(path.clone())
            .map_err(|_| WatcherError::QueueClosed)?;
        tracked.insert(path);
        Ok(true)
    }

    /// Whether `path` is tracked.
    #[must_use]
    pub fn is_tracked(&self, path: &Path) -> bool {
        self.tracked.lock().contains(path)
    }

    /// Stop tracking `path` after it left `queue/`, so a new file under the
    /// same name is queued again. Returns whether it was tracked.
    pub fn forget(&self, path: &Path) -> bool {
        self.tracked.lock().remove(path)
    }

    /// Whether the worker side has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl WorkReceiver {
    /// Wait for the next path. Returns `None` once every producer is dropped
    /// and the queue is drained.
    pub async fn recv(&mut self) -> Option<PathBuf> {
        self.rx.recv().await
    }

    /// Release `path` once its input no longer exists, so a later arrival
    /// under the same name is queued again. An input that is still present
    /// (a failed job) stays tracked.
    pub fn complete(&self, path: &Path) {
        self.tracked.lock().remove(path);
    }

    /// Number of tracked paths.
    #[must_use]
    pub fn tracked_len(&self) -> usize {
        self.tracked.lock().len()
    }
}
