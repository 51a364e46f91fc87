//! External PDF tool adapters.
//!
//! Each adapter wraps one subprocess with a fixed argument template:
//! - `Cleaner`: Ghostscript `pdfwrite` normalization
//! - `TextLayerProbe`: pdftotext, to decide whether OCR can be skipped
//! - `OcrEngine`: ocrmypdf, producing a PDF/A with a text layer
//! - `TextExtractor`: pdftotext, for the text sent to classification
//!
//! Success is judged by the presence of the expected output file.

mod cleaner;
mod ocrmypdf;
mod pdftotext;
mod runner;

use std::sync::Arc;

pub use cleaner::Cleaner;
pub use ocrmypdf::OcrEngine;
pub use pdftotext::{text_path_for, TextExtractor, TextLayerProbe};
pub use runner::{CommandRunner, Invocation, ProcessRunner, Tool, ToolError, ToolOutput};

#[cfg(test)]
pub(crate) use runner::fake;

/// Programs the system toolchain shells out to.
pub const REQUIRED_PROGRAMS: [&str; 3] = [
    cleaner::GHOSTSCRIPT,
    ocrmypdf::OCRMYPDF,
    pdftotext::PDFTOTEXT,
];

/// Required programs that cannot be found in PATH.
pub fn missing_programs() -> Vec<&'static str> {
    REQUIRED_PROGRAMS
        .iter()
        .copied()
        .filter(|program| which::which(program).is_err())
        .collect()
}

/// Default skew angle (degrees) above which ocrmypdf rotates a page.
pub const DEFAULT_ROTATE_PAGES_THRESHOLD: f32 = 5.0;

/// Tunables for the OCR engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOptions {
    /// Tesseract language string passed as `-l`, e.g. `deu+eng`.
    pub language: Option<String>,
    pub rotate_pages_threshold: f32,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            language: None,
            rotate_pages_threshold: DEFAULT_ROTATE_PAGES_THRESHOLD,
        }
    }
}

/// All four adapters sharing one command runner.
#[derive(Clone)]
pub struct PdfToolchain {
    pub cleaner: Cleaner,
    pub probe: TextLayerProbe,
    pub ocr: OcrEngine,
    pub extractor: TextExtractor,
}

impl PdfToolchain {
    pub fn new(runner: Arc<dyn CommandRunner>, options: OcrOptions) -> Self {
        Self {
            cleaner: Cleaner::new(runner.clone()),
            probe: TextLayerProbe::new(runner.clone()),
            ocr: OcrEngine::new(runner.clone(), options),
            extractor: TextExtractor::new(runner),
        }
    }

    /// Toolchain backed by real child processes.
    pub fn system(options: OcrOptions) -> Self {
        Self::new(Arc::new(ProcessRunner), options)
    }
}
