//! Searchable-PDF generation via ocrmypdf.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::runner::{run_checked, CommandRunner, Invocation, Tool, ToolError};
use super::OcrOptions;

pub(crate) const OCRMYPDF: &str = "ocrmypdf";

/// OCR engine producing PDF/A output with a text layer.
#[derive(Clone)]
pub struct OcrEngine {
    runner: Arc<dyn CommandRunner>,
    options: OcrOptions,
}

impl OcrEngine {
    pub fn new(runner: Arc<dyn CommandRunner>, options: OcrOptions) -> Self {
        Self { runner, options }
    }

    /// Build the ocrmypdf call for `input` -> `output`.
    ///
    /// Image optimization is disabled (`--optimize 0`): it crashes on some
    /// scanner output. OCR is forced so pages with a partial or broken text
    /// layer are redone.
    pub fn invocation(&self, input: &Path, output: &Path) -> Invocation {
        let mut args: Vec<OsString> = vec![
            "--optimize".into(),
            "0".into(),
            "--output-type".into(),
            "pdfa".into(),
            "--rotate-pages".into(),
            "--rotate-pages-threshold".into(),
            self.options.rotate_pages_threshold.to_string().into(),
            "--force-ocr".into(),
        ];
        if let Some(lang) = &self.options.language {
            args.push("-l".into());
            args.push(lang.into());
        }
        args.push(input.into());
        args.push(output.into());

        Invocation {
            tool: Tool::Ocr,
            program: OCRMYPDF.to_string(),
            args,
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        }
    }

    /// Produce a searchable copy of `input` at `output`.
    pub async fn ocr(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        debug!("OCR {} -> {}", input.display(), output.display());
        run_checked(self.runner.as_ref(), &self.invocation(input, output)).await
    }
}
