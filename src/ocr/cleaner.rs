//! PDF normalization via Ghostscript.
//!
//! Rewrites the incoming PDF through the `pdfwrite` device with a fixed
//! quality profile. Scanner and mail-client PDFs that trip up OCR usually
//! come out of this readable.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::runner::{run_checked, CommandRunner, Invocation, Tool, ToolError};

pub(crate) const GHOSTSCRIPT: &str = "gs";

/// Ghostscript-based PDF cleaner.
#[derive(Clone)]
pub struct Cleaner {
    runner: Arc<dyn CommandRunner>,
}

impl Cleaner {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Build the ghostscript call for `input` -> `output`.
    pub fn invocation(&self, input: &Path, output: &Path) -> Invocation {
        let mut out_arg = OsString::from("-sOutputFile=");
        out_arg.push(output);

        Invocation {
            tool: Tool::Cleaner,
            program: GHOSTSCRIPT.to_string(),
            args: vec![
                "-sDEVICE=pdfwrite".into(),
                "-dPDFSETTINGS=/prepress".into(),
                "-dNOPAUSE".into(),
                "-dBATCH".into(),
                "-dQUIET".into(),
                out_arg,
                input.into(),
            ],
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        }
    }

    /// Write a normalized copy of `input` to `output`.
    pub async fn clean(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        debug!("Cleaning {} -> {}", input.display(), output.display());
        run_checked(self.runner.as_ref(), &self.invocation(input, output)).await
    }
}
