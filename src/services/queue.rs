//! Intake queue and its single worker.
//!
//! Producers (start-up scan, watcher) push onto an unbounded FIFO channel.
//! Exactly one [`QueueWorker`] drains it, so no two documents are ever
//! processed at the same time and the ledger and `out/` have a single writer.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::pipeline::{DocumentPipeline, PipelineError};
use crate::config::Layout;
use crate::models::{QueueItem, Stage};
use crate::utils::shutdown_requested;

/// Something that processes one queued document to completion.
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    async fn process(&self, item: &QueueItem) -> Result<(), PipelineError>;
}

#[async_trait]
impl DocumentProcessor for DocumentPipeline {
    async fn process(&self, item: &QueueItem) -> Result<(), PipelineError> {
        DocumentPipeline::process(self, item).await.map(|_| ())
    }
}

/// Producer handle for the intake queue. Cheap to clone.
#[derive(Clone)]
pub struct IntakeQueue {
    tx: mpsc::UnboundedSender<QueueItem>,
}

impl IntakeQueue {
    /// Append an item. Returns `false` if the worker has stopped.
    pub fn enqueue(&self, item: QueueItem) -> bool {
        debug!("Enqueued {}", item);
        self.tx.send(item).is_ok()
    }

    #[cfg(test)]
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<QueueItem>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

/// Totals reported when the worker stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub succeeded: usize,
    pub failed: usize,
    /// Items whose source was gone by the time they were dequeued.
    pub skipped: usize,
}

/// The single consumer of the intake queue.
pub struct QueueWorker {
    rx: mpsc::UnboundedReceiver<QueueItem>,
    layout: Layout,
    processor: Arc<dyn DocumentProcessor>,
}

/// Create a queue and the worker that drains it.
pub fn intake_queue(
    layout: Layout,
    processor: Arc<dyn DocumentProcessor>,
) -> (IntakeQueue, QueueWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        IntakeQueue { tx },
        QueueWorker {
            rx,
            layout,
            processor,
        },
    )
}

impl QueueWorker {
    /// Process items in order until every producer is dropped or shutdown is
    /// signalled. A document in progress always runs to completion or failure.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> QueueStats {
        let mut stats = QueueStats::default();

        loop {
            let item = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => {
                    info!("Shutdown requested, stopping queue worker");
                    break;
                }
                item = self.rx.recv() => item,
            };
            let Some(item) = item else {
                debug!("All producers gone, queue drained");
                break;
            };

            let source = item.path_in(&self.layout, Stage::Intake);
            if !source.exists() {
                warn!("Skipping {}: {} no longer exists", item, source.display());
                stats.skipped += 1;
                continue;
            }

            match self.processor.process(&item).await {
                Ok(()) => stats.succeeded += 1,
                Err(e) => {
                    error!("Failed to process {}: {}", item, e);
                    stats.failed += 1;
                }
            }
        }

        info!(
            "Queue worker stopped: {} delivered, {} failed, {} skipped",
            stats.succeeded, stats.failed, stats.skipped
        );
        stats
    }
}
