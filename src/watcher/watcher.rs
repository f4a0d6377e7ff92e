//! Queue directory watcher using notify-rs.

use std::path::{Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::events::QueueEvent;
use crate::error::WatcherError;
use crate::Result;

/// Watches one directory, non-recursively, for arrivals and removals.
///
/// Events are buffered in an unbounded channel from the moment the watcher is
/// created, so nothing is lost while the caller is still busy elsewhere (for
/// example scanning the backlog).
pub struct QueueWatcher {
    _watcher: RecommendedWatcher,
    event_rx: mpsc::UnboundedReceiver<QueueEvent>,
    dir: PathBuf,
}

impl QueueWatcher {
    /// Subscribe to arrivals in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` is not a directory or the platform watcher
    /// cannot be created or attached.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.is_dir() {
            return Err(WatcherError::WatchFailed {
                path: dir.display().to_string(),
                reason: "directory does not exist".to_string(),
            }
            .into());
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let watched = dir.clone();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            let forwarded = match result {
                Ok(event) => QueueEvent::from_notify(&event),
                Err(e) => vec![QueueEvent::Error(e.to_string())],
            };
            for event in forwarded
                .into_iter()
                .filter(|ev| ev.path().map_or(true, |p| is_direct_child(&watched, p)))
            {
                // Receiver gone means the pipeline is shutting down.
                let _ = event_tx.send(event);
            }
        })
        .map_err(|e| WatcherError::WatchFailed {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatcherError::WatchFailed {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(path = %dir.display(), "Watching directory");

        Ok(Self {
            _watcher: watcher,
            event_rx,
            dir,
        })
    }

    /// Receive the next event.
    ///
    /// Returns `None` if the backend has shut down.
    pub async fn recv(&mut self) -> Option<QueueEvent> {
        self.event_rx.recv().await
    }

    /// The watched directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl std::fmt::Debug for QueueWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueWatcher").field("dir", &self.dir).finish()
    }
}

/// Some backends report nested paths even for non-recursive watches.
fn is_direct_child(dir: &Path, path: &Path) -> bool {
    path.parent() == Some(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_is_direct_child() {
        let dir = Path::new("/srv/media/queue");
        assert!(is_direct_child(dir, Path::new("/srv/media/queue/a.mov")));
        assert!(!is_direct_child(dir, Path::new("/srv/media/queue/sub/a.mov")));
        assert!(!is_direct_child(dir, Path::new("/srv/media/upload/a.mov")));
    }

    #[test]
    fn test_watcher_nonexistent_dir() {
        let result = QueueWatcher::new("/nonexistent/directory");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_watcher_reports_creation() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().canonicalize().unwrap();
        let mut watcher = QueueWatcher::new(&dir).unwrap();
        assert_eq!(watcher.dir(), dir.as_path());

        let file = dir.join("clip.mov");
        fs::write(&file, b"data").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), watcher.recv())
            .await
            .expect("timed out waiting for event")
            .unwrap();
        assert_eq!(event, QueueEvent::Arrived(file));
    }

    #[tokio::test]
    async fn test_watcher_reports_move_in() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().canonicalize().unwrap();
        let queue = base.join("queue");
        let upload = base.join("upload");
        fs::create_dir(&queue).unwrap();
        fs::create_dir(&upload).unwrap();
        fs::write(upload.join("clip.mov"), b"data").unwrap();

        let mut watcher = QueueWatcher::new(&queue).unwrap();
        fs::rename(upload.join("clip.mov"), queue.join("clip.mov")).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), watcher.recv())
            .await
            .expect("timed out waiting for event")
            .unwrap();
        assert_eq!(event, QueueEvent::Arrived(queue.join("clip.mov")));
    }
}
