//! Per-document processing pipeline.
//!
//! Drives one document through
//! `Intake -> Cleaned -> (Ocr'd | PassThrough) -> TextExtracted -> Classified -> Named -> Delivered`.
//! Any error stops the document where it is; intermediate artifacts stay on
//! disk so the document can be inspected or dropped back into intake.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::naming::claim_unique_name;
use crate::config::Layout;
use crate::llm::{ClassificationError, TitleClassifier};
use crate::models::{CanonicalTitle, Document, DocumentState, Stage};
use crate::ocr::{PdfToolchain, ToolError};
use crate::repository::{LedgerError, TitleLedger};
use crate::utils::{sanitize_title, FALLBACK_TITLE};

/// Errors that abort a single document.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Classification failed: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Ledger update failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Outcome of a delivered document.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Intake path the document came from (now removed).
    pub source: PathBuf,
    /// Final location in `out/`.
    pub output: PathBuf,
    /// Title as returned by classification.
    pub title: String,
    /// Base name chosen for the output file.
    pub name: String,
    pub ocr_performed: bool,
}

/// Runs documents through the external tools, the classifier and the ledger.
pub struct DocumentPipeline {
    layout: Layout,
    tools: PdfToolchain,
    classifier: Arc<dyn TitleClassifier>,
    ledger: TitleLedger,
}

impl DocumentPipeline {
    pub fn new(
        layout: Layout,
        tools: PdfToolchain,
        classifier: Arc<dyn TitleClassifier>,
    ) -> Self {
        let ledger = TitleLedger::new(&layout.ledger);
        Self {
            layout,
            tools,
            classifier,
            ledger,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn ledger(&self) -> &TitleLedger {
        &self.ledger
    }

    /// Process one document from intake to `out/`.
    pub async fn process(&self, doc: &Document) -> Result<Delivery, PipelineError> {
        let mut state = DocumentState::Intake;
        let result = self.run(doc, &mut state).await;
        if result.is_err() {
            warn!(
                "{}: stopped in state {}; artifacts left in place",
                doc.filename, state
            );
        }
        result
    }

    async fn run(
        &self,
        doc: &Document,
        state: &mut DocumentState,
    ) -> Result<Delivery, PipelineError> {
        let source = doc.path_in(&self.layout, Stage::Intake);
        let cleaned = doc.path_in(&self.layout, Stage::Cleaned);
        let ocr = doc.path_in(&self.layout, Stage::Ocr);

        info!("Processing {}", doc);

        self.tools.cleaner.clean(&source, &cleaned).await?;
        advance(doc, state, DocumentState::Cleaned);

        let ocr_performed =
            doc.mode.is_forced() || !self.tools.probe.has_text_layer(&cleaned).await?;

        if ocr_performed {
            self.tools.ocr.ocr(&cleaned, &ocr).await?;
            remove(&cleaned).await?;
            advance(doc, state, DocumentState::Ocrd);
        } else {
            debug!("{}: text layer present, skipping OCR", doc.filename);
            tokio::fs::rename(&cleaned, &ocr)
                .await
                .map_err(|source| PipelineError::Io {
                    action: "move",
                    path: cleaned.clone(),
                    source,
                })?;
            advance(doc, state, DocumentState::PassThrough);
        }

        let text = self.tools.extractor.extract(&ocr).await?;
        debug!("{}: extracted {} chars", doc.filename, text.chars().count());
        advance(doc, state, DocumentState::TextExtracted);

        let classification = self.classifier.classify(&text).await?;
        let title = classification.title;
        if CanonicalTitle::parse(&title).is_none() {
            warn!(
                "{}: classification '{}' is not in 'YYYY-MM-DD - Sender - Title' form",
                doc.filename, title
            );
        }
        advance(doc, state, DocumentState::Classified);

        let name = self.claim_name(&title)?;
        debug!("{}: claimed name '{}'", doc.filename, name);
        advance(doc, state, DocumentState::Named);

        let output = self.layout.out.join(format!("{}.pdf", name));
        tokio::fs::rename(&ocr, &output)
            .await
            .map_err(|source| PipelineError::Io {
                action: "deliver",
                path: ocr.clone(),
                source,
            })?;
        remove(&source).await?;
        advance(doc, state, DocumentState::Delivered);

        info!("Delivered {} -> {}", doc.filename, output.display());
        Ok(Delivery {
            source,
            output,
            title,
            name,
            ocr_performed,
        })
    }

    /// Sanitize the classified title and reserve a unique base name.
    fn claim_name(&self, title: &str) -> Result<String, LedgerError> {
        let mut base = sanitize_title(title.trim());
        if base.trim().is_empty() {
            base = FALLBACK_TITLE.to_string();
        }
        claim_unique_name(&self.ledger, &self.layout.out, &base)
    }
}

fn advance(doc: &Document, state: &mut DocumentState, next: DocumentState) {
    info!("{}: {} -> {}", doc.filename, state, next);
    *state = next;
}

async fn remove(path: &Path) -> Result<(), PipelineError> {
    tokio::fs::remove_file(path)
        .await
        .map_err(|source| PipelineError::Io {
            action: "remove",
            path: path.to_path_buf(),
            source,
        })
}
