//! Serial job worker.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::transcode::{TranscodeOutcome, Transcoder};
use crate::error::JobError;
use crate::job::{Job, JobEvent, JobState};
use crate::observability::spans;
use crate::queue::WorkReceiver;
use crate::topology::Topology;
use crate::Result;

/// Statistics for processed jobs.
#[derive(Debug, Default)]
pub struct WorkerStats {
    pub jobs_finished: AtomicU64,
    pub jobs_failed: AtomicU64,
    pub jobs_interrupted: AtomicU64,
}

impl WorkerStats {
    /// Create new stats tracker.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            jobs_finished: self.jobs_finished.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_interrupted: self.jobs_interrupted.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of worker stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStatsSnapshot {
    pub jobs_finished: u64,
    pub jobs_failed: u64,
    pub jobs_interrupted: u64,
}

/// Result of processing one job.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Input path as dequeued.
    pub input: PathBuf,
    /// Where the output is (or would have been) in `finished/`.
    pub output: PathBuf,
    /// State the job ended in.
    pub state: JobState,
    /// Wall time spent on the job.
    pub elapsed: Duration,
}

/// Consumes the work queue one job at a time.
#[derive(Debug)]
pub struct Worker {
    topology: Topology,
    transcoder: Transcoder,
    extension: String,
    receiver: WorkReceiver,
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Create a worker.
    pub fn new(
        topology: Topology,
        transcoder: Transcoder,
        extension: impl Into<String>,
        receiver: WorkReceiver,
    ) -> Self {
        Self {
            topology,
            transcoder,
            extension: extension.into(),
            receiver,
            stats: WorkerStats::new(),
        }
    }

    /// Get current stats.
    #[must_use]
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Process jobs until cancelled or every producer is gone.
    ///
    /// A new job is never started after `cancel` fires. A job already running
    /// is interrupted and its input left in `queue/`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error, such as a failed move into `finished/`.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        tracing::info!("Worker started");

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                path = self.receiver.recv() => path,
            };
            let Some(path) = next else {
                break;
            };

            let result = self.process(&path, &cancel).await;
            // A failed input stays in `queue/` and stays tracked, so a late
            // event for it is not run again.
            if matches!(tokio::fs::try_exists(&path).await, Ok(false)) {
                self.receiver.complete(&path);
            }

            match result {
                Ok(report) if report.state == JobState::Pending => break,
                Ok(_) => {}
                Err(e) if !e.is_fatal() => {
                    tracing::error!(path = %path.display(), error = %e, "Skipping job");
                    self.stats.jobs_failed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => return Err(e),
            }
        }

        let snapshot = self.stats.snapshot();
        tracing::info!(
            finished = snapshot.jobs_finished,
            failed = snapshot.jobs_failed,
            interrupted = snapshot.jobs_interrupted,
            "Worker stopped"
        );
        Ok(())
    }

    /// Run one job through its lifecycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the job cannot be set up or the finished output
    /// cannot be moved into `finished/`.
    pub async fn process(&self, input: &Path, cancel: &CancellationToken) -> Result<JobReport> {
        let mut job = Job::new(input, &self.topology, &self.extension)?;
        self.drive(&mut job, cancel)
            .instrument(spans::job_span(input))
            .await
    }

    async fn drive(&self, job: &mut Job, cancel: &CancellationToken) -> Result<JobReport> {
        let started = Instant::now();
        job.apply(JobEvent::Dequeued)?;
        tracing::info!(output = %job.working_path().display(), "Work on");

        let outcome = match self
            .transcoder
            .run(job.input(), job.working_path(), cancel)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) if !e.is_fatal() => {
                tracing::error!(error = %e, "Transcoder could not run");
                job.apply(JobEvent::TranscodeFailed)?;
                self.stats.jobs_failed.fetch_add(1, Ordering::Relaxed);
                return Ok(job_report(job, started));
            }
            Err(e) => return Err(e),
        };

        match outcome {
            TranscodeOutcome::Succeeded => {
                job.apply(JobEvent::TranscodeSucceeded)?;
                promote(job).await?;
                job.apply(JobEvent::RenameSucceeded)?;
                remove_source(job.input()).await;
                self.stats.jobs_finished.fetch_add(1, Ordering::Relaxed);
            }
            TranscodeOutcome::Failed(status) => {
                job.apply(JobEvent::TranscodeFailed)?;
                tracing::error!(%status, "Transcoder failed, input left in queue");
                self.stats.jobs_failed.fetch_add(1, Ordering::Relaxed);
            }
            TranscodeOutcome::Interrupted => {
                job.apply(JobEvent::Interrupted)?;
                discard_partial(job.working_path()).await;
                self.stats.jobs_interrupted.fetch_add(1, Ordering::Relaxed);
            }
        }

        let report = job_report(job, started);
        tracing::info!(
            state = ?report.state,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Job done"
        );
        Ok(report)
    }
}

fn job_report(job: &Job, started: Instant) -> JobReport {
    JobReport {
        input: job.input().to_path_buf(),
        output: job.finished_path().to_path_buf(),
        state: job.state(),
        elapsed: started.elapsed(),
    }
}

/// Move the output from `working/` to `finished/`.
async fn promote(job: &Job) -> Result<()> {
    let from = job.working_path();
    let to = job.finished_path();

    if matches!(tokio::fs::try_exists(to).await, Ok(true)) {
        tracing::warn!(output = %to.display(), "Replacing existing output");
    }

    tokio::fs::rename(from, to)
        .await
        .map_err(|e| JobError::PromoteFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            reason: e.to_string(),
        })?;

    tracing::info!(output = %to.display(), "Moved to finished");
    Ok(())
}

/// Remove the consumed input. Failure leaves a stale copy in `queue/`,
/// which is logged but not fatal.
async fn remove_source(input: &Path) {
    if let Err(e) = tokio::fs::remove_file(input).await {
        tracing::warn!(path = %input.display(), error = %e, "Could not remove source");
    }
}

async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not remove partial output");
        }
    }
}
