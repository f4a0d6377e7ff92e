//! Error types and Result aliases for ffqueue.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use std::path::PathBuf;

use thiserror::Error;

use crate::job::{JobEvent, JobState};

/// Result type alias using ffqueue's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ffqueue operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Directory layout error.
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// External transcoder error.
    #[error("transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    /// Job state machine error.
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Directory topology errors. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum TopologyError {
    /// Base directory does not exist.
    #[error("base directory '{}' does not exist", .0.display())]
    BaseMissing(PathBuf),

    /// A required path exists but is not a directory.
    #[error("'{}' exists and is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// A required directory could not be created.
    #[error("could not create directory '{}': {reason}", path.display())]
    CreateFailed { path: PathBuf, reason: String },

    /// The working directory could not be cleared.
    #[error("could not reset working directory '{}': {reason}", path.display())]
    ResetFailed { path: PathBuf, reason: String },
}

/// File watcher and work queue errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// The work queue receiver is gone.
    #[error("work queue closed")]
    QueueClosed,
}

/// External transcoder errors.
#[derive(Error, Debug)]
pub enum TranscodeError {
    /// Program not found on the executable search path.
    #[error("transcoder '{program}' not found: {reason}")]
    NotFound { program: String, reason: String },

    /// Child process could not be started.
    #[error("failed to spawn '{}': {reason}", program.display())]
    SpawnFailed { program: PathBuf, reason: String },

    /// Waiting on the child process failed.
    #[error("failed to wait on '{}': {reason}", program.display())]
    WaitFailed { program: PathBuf, reason: String },
}

/// Job lifecycle errors.
#[derive(Error, Debug)]
pub enum JobError {
    /// Event not valid for the current state.
    #[error("invalid transition: {event:?} in state {state:?}")]
    InvalidTransition { state: JobState, event: JobEvent },

    /// Moving a finished output out of the working directory failed.
    #[error("could not move '{}' to '{}': {reason}", from.display(), to.display())]
    PromoteFailed {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    /// Input path has no usable file name.
    #[error("'{}' has no file name", .0.display())]
    NoFileName(PathBuf),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error must stop the pipeline.
    ///
    /// Transcoder spawn and wait failures, and inputs without a usable name,
    /// only fail the current job.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Transcode(TranscodeError::SpawnFailed { .. } | TranscodeError::WaitFailed { .. })
                | Self::Job(JobError::NoFileName(_))
        )
    }
}

impl TopologyError {
    /// Create a creation error for `path`.
    pub fn create_failed(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::CreateFailed {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}
