//! Backlog scanner for files already waiting in `queue/` at startup.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use ignore::WalkBuilder;

use super::filter::{Admission, QueueFilter};
use crate::queue::WorkQueue;
use crate::Result;

/// Scan statistics.
#[derive(Debug, Default)]
pub struct ScanStats {
    pub files_found: AtomicU64,
    pub files_queued: AtomicU64,
    pub files_skipped: AtomicU64,
    pub duplicates: AtomicU64,
    pub errors: AtomicU64,
}

impl ScanStats {
    /// Create new stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> ScanStatsSnapshot {
        ScanStatsSnapshot {
            files_found: self.files_found.load(Ordering::Relaxed),
            files_queued: self.files_queued.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of scan stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStatsSnapshot {
    pub files_found: u64,
    pub files_queued: u64,
    pub files_skipped: u64,
    pub duplicates: u64,
    pub errors: u64,
}

/// Queue every eligible file directly inside `queue_dir`.
///
/// Only the top level is listed. Entries are visited in file-name order;
/// directories and hidden files are skipped. If the worker goes away (for
/// example on shutdown) the scan stops early.
pub fn scan_backlog(queue_dir: &Path, queue: &WorkQueue) -> ScanStatsSnapshot {
    let stats = ScanStats::new();

    tracing::info!(path = %queue_dir.display(), "Scanning backlog");

    let walker = WalkBuilder::new(queue_dir)
        .standard_filters(false)
        .max_depth(Some(1))
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        match entry {
            Ok(entry) => {
                // The root itself.
                if entry.depth() == 0 {
                    continue;
                }

                let entry_path = entry.path();
                stats.files_found.fetch_add(1, Ordering::Relaxed);

                match QueueFilter::classify(entry_path) {
                    Admission::Accept => {}
                    admission => {
                        tracing::trace!(path = %entry_path.display(), ?admission, "Skipping backlog entry");
                        stats.files_skipped.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                }

                match queue.enqueue(entry_path.to_path_buf()) {
                    Ok(true) => {
                        stats.files_queued.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(false) => {
                        stats.duplicates.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(_) => {
                        tracing::warn!("Work queue closed during scan");
                        break;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error listing queue directory");
                stats.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    let snapshot = stats.snapshot();
    tracing::info!(
        path = %queue_dir.display(),
        found = snapshot.files_found,
        queued = snapshot.files_queued,
        skipped = snapshot.files_skipped,
        duplicates = snapshot.duplicates,
        errors = snapshot.errors,
        "Backlog scan complete"
    );

    snapshot
}

/// Async version of the backlog scan.
///
/// # Errors
///
/// Returns an error if the scan task panics.
pub async fn scan_backlog_async(queue_dir: &Path, queue: &WorkQueue) -> Result<ScanStatsSnapshot> {
    let path = queue_dir.to_path_buf();
    let queue = queue.clone();

    tokio::task::spawn_blocking(move || scan_backlog(&path, &queue))
        .await
        .map_err(|e| crate::Error::internal(format!("Scan task failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    async fn drain(queue: WorkQueue, mut rx: crate::queue::WorkReceiver) -> Vec<PathBuf> {
        drop(queue);
        let mut paths = vec![];
        while let Some(p) = rx.recv().await {
            paths.push(p);
        }
        paths
    }

    #[tokio::test]
    async fn test_scan_backlog() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.mov"), b"b").unwrap();
        fs::write(tmp.path().join("a.mkv"), b"a").unwrap();
        fs::write(tmp.path().join(".DS_Store"), b"").unwrap();
        fs::create_dir(tmp.path().join("subdir")).unwrap();
        fs::write(tmp.path().join("subdir/nested.mov"), b"n").unwrap();

        let (queue, rx) = WorkQueue::unbounded();
        let stats = scan_backlog(tmp.path(), &queue);

        assert_eq!(stats.files_found, 4);
        assert_eq!(stats.files_queued, 2);
        assert_eq!(stats.files_skipped, 2);
        assert_eq!(stats.errors, 0);

        assert_eq!(
            drain(queue, rx).await,
            vec![tmp.path().join("a.mkv"), tmp.path().join("b.mov")]
        );
    }

    #[test]
    fn test_scan_empty_dir() {
        let tmp = TempDir::new().unwrap();
        let (queue, _rx) = WorkQueue::unbounded();

        let stats = scan_backlog(tmp.path(), &queue);
        assert_eq!(stats.files_found, 0);
        assert_eq!(stats.files_queued, 0);
    }

    #[test]
    fn test_scan_counts_duplicates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.mov");
        fs::write(&path, b"a").unwrap();

        let (queue, _rx) = WorkQueue::unbounded();
        assert!(queue.enqueue(path).unwrap());

        let stats = scan_backlog(tmp.path(), &queue);
        assert_eq!(stats.files_queued, 0);
        assert_eq!(stats.duplicates, 1);
    }

    #[test]
    fn test_scan_closed_queue() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.mov"), b"a").unwrap();

        fs::write(tmp.path().join("b.mov"), b"b").unwrap();

        let (queue, rx) = WorkQueue::unbounded();
        drop(rx);

        let stats = scan_backlog(tmp.path(), &queue);
        assert_eq!(stats.files_found, 1);
        assert_eq!(stats.files_queued, 0);
    }

    #[tokio::test]
    async fn test_scan_backlog_async() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("clip.mov"), b"c").unwrap();

        let (queue, mut rx) = WorkQueue::unbounded();
        let stats = scan_backlog_async(tmp.path(), &queue).await.unwrap();

        assert_eq!(stats.files_queued, 1);
        assert_eq!(rx.recv().await.unwrap(), tmp.path().join("clip.mov"));
    }
}
