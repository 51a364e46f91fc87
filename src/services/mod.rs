//! Service layer: the document pipeline and what feeds it.
//!
//! - `naming`: unique output base names backed by the title ledger
//! - `pipeline`: one document from intake to `out/`
//! - `queue`: single-worker FIFO in front of the pipeline
//! - `watcher`: start-up scan and settle-delayed filesystem events

pub mod naming;
pub mod pipeline;
pub mod queue;
pub mod watcher;

pub use naming::claim_unique_name;
pub use pipeline::{Delivery, DocumentPipeline, PipelineError};
pub use queue::{intake_queue, DocumentProcessor, IntakeQueue, QueueStats, QueueWorker};
pub use watcher::{startup_scan, IntakeWatcher};
