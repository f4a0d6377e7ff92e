//! Startup sequencing and task wiring.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::queue::WorkQueue;
use crate::topology::Topology;
use crate::watcher::{scan_backlog_async, EventHandler, QueueWatcher, WatcherStats};
use crate::worker::{Transcoder, Worker};
use crate::{Error, Result};

/// The whole queue: directory layout, intake and the worker.
#[derive(Debug)]
pub struct Pipeline {
    config: Arc<Config>,
    transcoder: Transcoder,
}

impl Pipeline {
    /// Create a pipeline for a validated configuration and a located transcoder.
    #[must_use]
    pub const fn new(config: Arc<Config>, transcoder: Transcoder) -> Self {
        Self { config, transcoder }
    }

    /// Run until `cancel` fires or a fatal error occurs.
    ///
    /// Startup order: prepare the layout, start the worker, subscribe to
    /// `queue/`, then scan the backlog. Subscribing first means a file landing
    /// during the scan is seen by at least one of the two; the work queue
    /// drops the second sighting.
    ///
    /// # Errors
    ///
    /// Returns any startup failure, or the worker's fatal error.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        // Everything spawned below stops when this returns, whichever way.
        let _stop = cancel.clone().drop_guard();

        let topology = Topology::open(&self.config.base_dir)?;

        let (queue, receiver) = WorkQueue::unbounded();
        let worker = Worker::new(
            topology.clone(),
            self.transcoder,
            self.config.output_extension.clone(),
            receiver,
        );
        let worker_task = tokio::spawn(worker.run(cancel.clone()));

        let watcher = QueueWatcher::new(topology.queue())?;
        scan_backlog_async(topology.queue(), &queue).await?;

        let handler = EventHandler::new(queue, WatcherStats::new());
        let handler_task = tokio::spawn(handler.run(watcher, cancel.clone()));

        let worker_result = worker_task
            .await
            .map_err(|e| Error::internal(format!("worker task failed: {e}")))?;

        cancel.cancel();
        let handler_result = handler_task
            .await
            .map_err(|e| Error::internal(format!("event handler task failed: {e}")))?;

        worker_result?;
        handler_result?;

        tracing::info!("Pipeline stopped");
        Ok(())
    }
}
