//! Plain-text extraction via pdftotext (Poppler).
//!
//! Used twice: once as a probe for an existing text layer, once to get the
//! text that is sent for classification. Both write a sibling `.txt` file,
//! read it back and remove it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use super::runner::{run_checked, CommandRunner, Invocation, Tool, ToolError};

pub(crate) const PDFTOTEXT: &str = "pdftotext";

/// Sibling text path for a PDF (`ocr/a.pdf` -> `ocr/a.txt`).
pub fn text_path_for(pdf: &Path) -> PathBuf {
    pdf.with_extension("txt")
}

fn pdftotext_invocation(tool: Tool, input: &Path) -> Invocation {
    let output = text_path_for(input);
    Invocation {
        tool,
        program: PDFTOTEXT.to_string(),
        args: vec![input.into(), output.clone().into()],
        input: input.to_path_buf(),
        output,
    }
}

async fn read_text(path: &Path) -> Result<String, ToolError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn remove_scratch(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

/// Detects whether a PDF already carries machine-readable text.
///
/// Never modifies its input; the scratch text file is removed whatever the
/// outcome.
#[derive(Clone)]
pub struct TextLayerProbe {
    runner: Arc<dyn CommandRunner>,
}

impl TextLayerProbe {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub fn invocation(&self, input: &Path) -> Invocation {
        pdftotext_invocation(Tool::TextLayerProbe, input)
    }

    /// `true` if the extracted text is non-empty after trimming.
    pub async fn has_text_layer(&self, input: &Path) -> Result<bool, ToolError> {
        let invocation = self.invocation(input);
        let result = async {
            run_checked(self.runner.as_ref(), &invocation).await?;
            read_text(&invocation.output).await
        }
        .await;
        remove_scratch(&invocation.output).await;

        let has_text = !result?.trim().is_empty();
        debug!("Text layer in {}: {}", input.display(), has_text);
        Ok(has_text)
    }
}

/// Extracts the final plain text of a PDF.
#[derive(Clone)]
pub struct TextExtractor {
    runner: Arc<dyn CommandRunner>,
}

impl TextExtractor {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub fn invocation(&self, input: &Path) -> Invocation {
        pdftotext_invocation(Tool::TextExtractor, input)
    }

    pub async fn extract(&self, input: &Path) -> Result<String, ToolError> {
        let invocation = self.invocation(input);
        let result = async {
            run_checked(self.runner.as_ref(), &invocation).await?;
            read_text(&invocation.output).await
        }
        .await;
        remove_scratch(&invocation.output).await;

        let text = result?;
        debug!("Extracted {} chars from {}", text.len(), input.display());
        Ok(text)
    }
}
