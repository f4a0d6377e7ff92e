//! Job execution.
//!
//! One worker pulls paths off the work queue and runs the external
//! transcoder for each, strictly one at a time.

mod transcode;
#[allow(clippy::module_inception)]
mod worker;

pub use transcode::{TranscodeOutcome, Transcoder};
pub use worker::{JobReport, Worker, WorkerStats, WorkerStatsSnapshot};
