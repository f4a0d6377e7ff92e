//! Directory layout under the base path.
//!
//! A job's state is visible on disk by where its files live:
//! - `queue/`    inbound, watched; dropping a file here requests work
//! - `working/`  transcoder output while a job is in flight
//! - `finished/` completed output
//! - `upload/`   unwatched landing zone for slow transfers

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::TopologyError;
use crate::Result;

/// Name of the watched inbound directory.
pub const QUEUE_DIR: &str = "queue";
/// Name of the scratch output directory.
pub const WORKING_DIR: &str = "working";
/// Name of the terminal output directory.
pub const FINISHED_DIR: &str = "finished";
/// Name of the unwatched staging directory.
pub const UPLOAD_DIR: &str = "upload";

/// Absolute paths of every directory the pipeline uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    base: PathBuf,
    queue: PathBuf,
    working: PathBuf,
    finished: PathBuf,
    upload: PathBuf,
}

impl Topology {
    /// Compute the layout under `base`. Touches nothing on disk.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            queue: base.join(QUEUE_DIR),
            working: base.join(WORKING_DIR),
            finished: base.join(FINISHED_DIR),
            upload: base.join(UPLOAD_DIR),
            base,
        }
    }

    /// Resolve `base` to its canonical form and [`prepare`](Self::prepare)
    /// the layout under it.
    ///
    /// Watch events report canonical paths on some platforms, so every path
    /// the pipeline hands around is derived from the canonical base.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` does not exist, cannot be resolved, or
    /// preparation fails.
    pub fn open(base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref();
        let canonical = match fs::canonicalize(base) {
            Ok(path) => path,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TopologyError::BaseMissing(base.to_path_buf()).into());
            }
            Err(e) => return Err(e.into()),
        };

        let topology = Self::new(canonical);
        topology.prepare()?;
        Ok(topology)
    }

    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    #[must_use]
    pub fn queue(&self) -> &Path {
        &self.queue
    }

    #[must_use]
    pub fn working(&self) -> &Path {
        &self.working
    }

    #[must_use]
    pub fn finished(&self) -> &Path {
        &self.finished
    }

    #[must_use]
    pub fn upload(&self) -> &Path {
        &self.upload
    }

    /// Make the layout ready for a fresh run.
    ///
    /// The base directory must already exist. Missing subdirectories are
    /// created and `working/` is emptied, since anything left there belongs to
    /// a transcode that never finished. Whatever sits at `working` is
    /// replaced by a fresh directory; a symlink is unlinked, never followed.
    /// Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an error if the base is missing, a required path is not a
    /// directory, or any filesystem operation fails.
    pub fn prepare(&self) -> Result<()> {
        match fs::metadata(&self.base) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(TopologyError::NotADirectory(self.base.clone()).into()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TopologyError::BaseMissing(self.base.clone()).into());
            }
            Err(e) => return Err(e.into()),
        }

        ensure_dir(&self.queue)?;
        ensure_dir(&self.upload)?;
        self.reset_working()?;
        ensure_dir(&self.finished)?;

        tracing::info!(base = %self.base.display(), "Directory layout ready");
        Ok(())
    }

    fn reset_working(&self) -> Result<()> {
        match fs::symlink_metadata(&self.working) {
            Ok(meta) => {
                let removed = if meta.is_dir() {
                    fs::remove_dir_all(&self.working)
                } else {
                    fs::remove_file(&self.working)
                };
                removed.map_err(|e| TopologyError::ResetFailed {
                    path: self.working.clone(),
                    reason: e.to_string(),
                })?;
                tracing::debug!(path = %self.working.display(), "Cleared leftover working files");
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(TopologyError::ResetFailed {
                    path: self.working.clone(),
                    reason: e.to_string(),
                }
                .into());
            }
        }
        ensure_dir(&self.working)
    }
}

/// Create `path` if missing; fail if it exists as something other than a directory.
fn ensure_dir(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => return Err(TopologyError::NotADirectory(path.to_path_buf()).into()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    match fs::create_dir(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Created directory");
            Ok(())
        }
        // Lost a race with another creator; fine as long as it is a directory.
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(TopologyError::create_failed(path, &e).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use tempfile::TempDir;

    fn dir_names(base: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(base)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_paths() {
        let topo = Topology::new("/srv/media");
        assert_eq!(topo.queue(), Path::new("/srv/media/queue"));
        assert_eq!(topo.working(), Path::new("/srv/media/working"));
        assert_eq!(topo.finished(), Path::new("/srv/media/finished"));
        assert_eq!(topo.upload(), Path::new("/srv/media/upload"));
        assert_eq!(topo.base(), Path::new("/srv/media"));
    }

    #[test]
    fn test_prepare_creates_layout() {
        let tmp = TempDir::new().unwrap();
        let topo = Topology::new(tmp.path());
        topo.prepare().unwrap();

        assert_eq!(
            dir_names(tmp.path()),
            vec!["finished", "queue", "upload", "working"]
        );
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let topo = Topology::new(tmp.path());

        topo.prepare().unwrap();
        let first = dir_names(tmp.path());
        topo.prepare().unwrap();
        let second = dir_names(tmp.path());

        assert_eq!(first, second);
    }

    #[test]
    fn test_prepare_keeps_queue_and_finished_contents() {
        let tmp = TempDir::new().unwrap();
        let topo = Topology::new(tmp.path());
        topo.prepare().unwrap();

        fs::write(topo.queue().join("a.mov"), b"in").unwrap();
        fs::write(topo.finished().join("b.mp4"), b"out").unwrap();
        topo.prepare().unwrap();

        assert!(topo.queue().join("a.mov").exists());
        assert!(topo.finished().join("b.mp4").exists());
    }

    #[test]
    fn test_prepare_empties_working() {
        let tmp = TempDir::new().unwrap();
        let topo = Topology::new(tmp.path());
        topo.prepare().unwrap();

        fs::write(topo.working().join("partial.mp4"), b"half").unwrap();
        fs::create_dir(topo.working().join("nested")).unwrap();
        fs::write(topo.working().join("nested/x"), b"x").unwrap();

        topo.prepare().unwrap();

        assert!(topo.working().is_dir());
        assert_eq!(fs::read_dir(topo.working()).unwrap().count(), 0);
    }

    #[test]
    fn test_open_canonicalizes() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("media");
        fs::create_dir(&nested).unwrap();

        let topo = Topology::open(nested.join("..").join("media")).unwrap();
        assert_eq!(topo.base(), nested.canonicalize().unwrap());
        assert!(topo.queue().is_dir());
        assert!(topo.working().is_dir());
    }

    #[test]
    fn test_open_missing_base() {
        let tmp = TempDir::new().unwrap();
        let err = Topology::open(tmp.path().join("absent")).unwrap_err();
        assert!(matches!(
            err,
            Error::Topology(TopologyError::BaseMissing(_))
        ));
    }

    #[test]
    fn test_prepare_missing_base() {
        let tmp = TempDir::new().unwrap();
        let topo = Topology::new(tmp.path().join("absent"));

        let err = topo.prepare().unwrap_err();
        assert!(matches!(
            err,
            Error::Topology(TopologyError::BaseMissing(_))
        ));
        assert!(!tmp.path().join("absent").exists());
    }

    #[test]
    fn test_prepare_base_is_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("base");
        fs::write(&file, b"").unwrap();

        let err = Topology::new(&file).prepare().unwrap_err();
        assert!(matches!(
            err,
            Error::Topology(TopologyError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_open_unresolvable_base_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain");
        fs::write(&file, b"").unwrap();

        let err = Topology::open(file.join("media")).unwrap_err();
        assert!(matches!(err, Error::Io(_)), "unexpected error: {err}");
    }

    #[test]
    fn test_prepare_replaces_working_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(WORKING_DIR), b"stray").unwrap();

        let topo = Topology::new(tmp.path());
        topo.prepare().unwrap();
        assert!(topo.working().is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_prepare_unlinks_working_symlink() {
        let tmp = TempDir::new().unwrap();
        let elsewhere = tmp.path().join("elsewhere");
        fs::create_dir(&elsewhere).unwrap();
        fs::write(elsewhere.join("keep.mp4"), b"keep").unwrap();

        let base = tmp.path().join("base");
        fs::create_dir(&base).unwrap();
        std::os::unix::fs::symlink(&elsewhere, base.join(WORKING_DIR)).unwrap();

        let topo = Topology::new(&base);
        topo.prepare().unwrap();

        let meta = fs::symlink_metadata(topo.working()).unwrap();
        assert!(meta.is_dir());
        assert_eq!(fs::read_dir(topo.working()).unwrap().count(), 0);
        assert!(elsewhere.join("keep.mp4").exists());
    }

    #[test]
    fn test_prepare_subdir_is_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(QUEUE_DIR), b"not a dir").unwrap();

        let err = Topology::new(tmp.path()).prepare().unwrap_err();
        match err {
            Error::Topology(TopologyError::NotADirectory(path)) => {
                assert!(path.ends_with(QUEUE_DIR));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
