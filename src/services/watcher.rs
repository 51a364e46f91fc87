//! Document discovery: a start-up scan plus live filesystem events.
//!
//! Events are debounced by a settle timer per path. A path is enqueued only
//! if it still exists when its timer fires, which filters out
//! create-then-replace sequences from editors and sync clients as well as
//! deletions.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::queue::IntakeQueue;
use crate::config::Layout;
use crate::models::{Document, ProcessingMode};
use crate::utils::{has_pdf_extension, shutdown_requested};

/// PDFs already waiting in the intake directories: normal first, then forced,
/// each sorted by filename.
pub fn startup_scan(layout: &Layout) -> Vec<Document> {
    let mut found = Vec::new();
    for mode in [ProcessingMode::Normal, ProcessingMode::Forced] {
        found.extend(scan_dir(layout.intake_dir(mode), mode));
    }
    info!("Start-up scan found {} document(s)", found.len());
    found
}

fn scan_dir(dir: &Path, mode: ProcessingMode) -> Vec<Document> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot scan {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut docs: Vec<Document> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.path())
        .filter(|path| has_pdf_extension(path))
        .filter_map(|path| Document::from_path(&path, mode))
        .collect();
    docs.sort_by(|a, b| a.filename.cmp(&b.filename));
    docs
}

/// Whether an event can announce a newly arrived file.
fn is_arrival(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_))
    )
}

/// Watches both intake directories and feeds settled PDFs into the queue.
pub struct IntakeWatcher {
    layout: Layout,
    queue: IntakeQueue,
    settle_delay: Duration,
}

impl IntakeWatcher {
    pub fn new(layout: Layout, queue: IntakeQueue, settle_delay: Duration) -> Self {
        Self {
            layout,
            queue,
            settle_delay,
        }
    }

    /// Watch until shutdown is signalled.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), notify::Error> {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = event_tx.send(res);
            },
            NotifyConfig::default(),
        )?;
        for mode in [ProcessingMode::Normal, ProcessingMode::Forced] {
            watcher.watch(self.layout.intake_dir(mode), RecursiveMode::NonRecursive)?;
        }
        info!(
            "Watching {} and {} (settle delay {:?})",
            self.layout.intake.display(),
            self.layout.force_intake.display(),
            self.settle_delay
        );

        self.handle_events(event_rx, shutdown).await;
        drop(watcher);
        Ok(())
    }

    /// Event loop, separate from the OS watcher so it can be driven directly.
    ///
    /// Returns on shutdown, or once the event stream has ended and every
    /// pending settle timer has fired.
    async fn handle_events(
        &self,
        mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let (settled_tx, mut settled_rx) = mpsc::unbounded_channel::<PathBuf>();
        let mut pending: HashSet<PathBuf> = HashSet::new();
        let mut events_open = true;

        while events_open || !pending.is_empty() {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => {
                    info!("Shutdown requested, stopping watcher ({} pending)", pending.len());
                    return;
                }
                Some(path) = settled_rx.recv() => {
                    pending.remove(&path);
                    self.confirm(&path);
                }
                event = events.recv(), if events_open => match event {
                    Some(Ok(event)) => self.schedule(event, &mut pending, &settled_tx),
                    Some(Err(e)) => warn!("Watch error: {}", e),
                    None => events_open = false,
                },
            }
        }
    }

    /// Start a settle timer for every new intake PDF in the event.
    fn schedule(
        &self,
        event: Event,
        pending: &mut HashSet<PathBuf>,
        settled_tx: &mpsc::UnboundedSender<PathBuf>,
    ) {
        if !is_arrival(&event.kind) {
            return;
        }
        for path in event.paths {
            if !has_pdf_extension(&path) || self.layout.mode_for(&path).is_none() {
                continue;
            }
            if !pending.insert(path.clone()) {
                debug!("{} already settling", path.display());
                continue;
            }
            debug!("Settling {} for {:?}", path.display(), self.settle_delay);
            let tx = settled_tx.clone();
            let delay = self.settle_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(path);
            });
        }
    }

    /// Enqueue a settled path if it is still there.
    fn confirm(&self, path: &Path) {
        if !path.exists() {
            debug!("{} vanished before settling", path.display());
            return;
        }
        let Some(doc) = self
            .layout
            .mode_for(path)
            .and_then(|mode| Document::from_path(path, mode))
        else {
            return;
        };
        info!("New document {}", doc);
        if !self.queue.enqueue(doc) {
            warn!("Queue worker stopped, dropping {}", path.display());
        }
    }
}
