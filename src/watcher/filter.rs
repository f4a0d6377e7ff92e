//! Admission rules for files in `queue/`.

use std::io::ErrorKind;
use std::path::Path;

/// Outcome of checking a path against the admission rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Regular, visible file; should be queued.
    Accept,
    /// Path vanished before it could be checked.
    Missing,
    /// Path is a directory.
    Directory,
    /// File name starts with `.`.
    Hidden,
    /// Path has no file name, or an empty one.
    Unnamed,
    /// Metadata could not be read for a reason other than absence.
    Unreadable,
}

impl Admission {
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// File filter for the queue directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueFilter;

impl QueueFilter {
    /// Check `path` on disk.
    ///
    /// Name rules are checked before touching the filesystem, so hidden files
    /// are rejected even if they disappear in the meantime.
    #[must_use]
    pub fn classify(path: &Path) -> Admission {
        if let Some(admission) = Self::classify_name(path) {
            return admission;
        }

        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Admission::Directory,
            Ok(_) => Admission::Accept,
            Err(e) if e.kind() == ErrorKind::NotFound => Admission::Missing,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot stat queued path");
                Admission::Unreadable
            }
        }
    }

    /// Name-only checks. `None` means the name is acceptable.
    #[must_use]
    pub fn classify_name(path: &Path) -> Option<Admission> {
        let Some(name) = path.file_name() else {
            return Some(Admission::Unnamed);
        };
        if name.is_empty() {
            return Some(Admission::Unnamed);
        }
        if Self::is_hidden_name(&name.to_string_lossy()) {
            return Some(Admission::Hidden);
        }
        None
    }

    /// Whether a file name marks a hidden file.
    #[must_use]
    pub fn is_hidden_name(name: &str) -> bool {
        name.starts_with('.')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_hidden_name() {
        assert!(QueueFilter::is_hidden_name(".DS_Store"));
        assert!(QueueFilter::is_hidden_name(".partial.mov"));
        assert!(!QueueFilter::is_hidden_name("clip.mov"));
        assert!(!QueueFilter::is_hidden_name("é.mov"));
        assert!(!QueueFilter::is_hidden_name(""));
    }

    #[test]
    fn test_classify_regular_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clip.mov");
        fs::write(&path, b"data").unwrap();

        assert_eq!(QueueFilter::classify(&path), Admission::Accept);
        assert!(QueueFilter::classify(&path).is_accepted());
    }

    #[test]
    fn test_classify_rejections() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".DS_Store"), b"").unwrap();
        fs::create_dir(tmp.path().join("season1")).unwrap();

        assert_eq!(
            QueueFilter::classify(&tmp.path().join(".DS_Store")),
            Admission::Hidden
        );
        assert_eq!(
            QueueFilter::classify(&tmp.path().join("season1")),
            Admission::Directory
        );
        assert_eq!(
            QueueFilter::classify(&tmp.path().join("gone.mov")),
            Admission::Missing
        );
        assert_eq!(QueueFilter::classify(Path::new("/")), Admission::Unnamed);
    }

    #[test]
    fn test_hidden_checked_without_stat() {
        assert_eq!(
            QueueFilter::classify(Path::new("/nonexistent/.hidden.mov")),
            Admission::Hidden
        );
    }
}
