//! Job lifecycle as an explicit state machine.
//!
//! The worker drives a [`Job`] through [`JobState`] by feeding it
//! [`JobEvent`]s. File moves happen alongside the transitions, but the state
//! itself lives here, so the rules can be checked without a filesystem.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::JobError;
use crate::topology::Topology;
use crate::Result;

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Input sits in `queue/` waiting for the worker.
    Pending,
    /// Transcoder is running, writing into `working/`.
    InFlight,
    /// Transcoder exited 0; output not yet moved to `finished/`.
    Transcoded,
    /// Output is in `finished/`. Terminal.
    Finished,
    /// Transcoder failed; input left in `queue/`. Terminal.
    Failed,
}

/// Something that happened to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    /// Worker took the job off the queue.
    Dequeued,
    /// Transcoder exited with status 0.
    TranscodeSucceeded,
    /// Transcoder exited non-zero or could not be run.
    TranscodeFailed,
    /// Output moved from `working/` to `finished/`.
    RenameSucceeded,
    /// Shutdown stopped the transcoder before it finished.
    Interrupted,
}

impl JobState {
    /// Apply `event`, returning the next state.
    ///
    /// # Errors
    ///
    /// Returns `JobError::InvalidTransition` if `event` cannot happen in this state.
    pub fn transition(self, event: JobEvent) -> Result<Self> {
        let next = match (self, event) {
            (Self::Pending, JobEvent::Dequeued) => Self::InFlight,
            (Self::InFlight, JobEvent::TranscodeSucceeded) => Self::Transcoded,
            (Self::InFlight, JobEvent::TranscodeFailed) => Self::Failed,
            (Self::InFlight, JobEvent::Interrupted) => Self::Pending,
            (Self::Transcoded, JobEvent::RenameSucceeded) => Self::Finished,
            (state, event) => return Err(JobError::InvalidTransition { state, event }.into()),
        };
        Ok(next)
    }

    /// Whether no further events are accepted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

/// One input file's trip through the pipeline.
#[derive(Debug, Clone)]
pub struct Job {
    input: PathBuf,
    working: PathBuf,
    finished: PathBuf,
    state: JobState,
}

impl Job {
    /// Create a pending job for `input`, deriving its output locations.
    ///
    /// # Errors
    ///
    /// Returns `JobError::NoFileName` if `input` has no file name.
    pub fn new(input: impl Into<PathBuf>, topology: &Topology, extension: &str) -> Result<Self> {
        let input = input.into();
        let name = output_file_name(&input, extension)?;
        Ok(Self {
            working: topology.working().join(&name),
            finished: topology.finished().join(&name),
            input,
            state: JobState::Pending,
        })
    }

    #[must_use]
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Output path while the transcoder runs.
    #[must_use]
    pub fn working_path(&self) -> &Path {
        &self.working
    }

    /// Output path once the job is finished.
    #[must_use]
    pub fn finished_path(&self) -> &Path {
        &self.finished
    }

    #[must_use]
    pub const fn state(&self) -> JobState {
        self.state
    }

    /// Advance the job.
    ///
    /// # Errors
    ///
    /// Returns an error if `event` is not valid in the current state; the
    /// state is left unchanged.
    pub fn apply(&mut self, event: JobEvent) -> Result<JobState> {
        self.state = self.state.transition(event)?;
        Ok(self.state)
    }
}

/// Output file name for `input`: its base name with the last extension
/// replaced by `extension` (or `extension` appended if it has none).
///
/// # Errors
///
/// Returns `JobError::NoFileName` if `input` has no file name.
pub fn output_file_name(input: &Path, extension: &str) -> Result<OsString> {
    let stem = input
        .file_stem()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| JobError::NoFileName(input.to_path_buf()))?;
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(extension);
    Ok(name)
}
