//! Subprocess execution for the external PDF tools.
//!
//! Exit codes of the external tools are not trusted uniformly (ghostscript
//! and ocrmypdf both exit non-zero on recoverable warnings), so adapters
//! treat the presence of the expected output file as the only success
//! signal. The runner just executes and reports.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// The external tools the pipeline depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Ghostscript PDF normalization.
    Cleaner,
    /// pdftotext used to detect an existing text layer.
    TextLayerProbe,
    /// ocrmypdf.
    Ocr,
    /// pdftotext used for the final classification text.
    TextExtractor,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Cleaner => "cleaner",
            Tool::TextLayerProbe => "text-layer-probe",
            Tool::Ocr => "ocr",
            Tool::TextExtractor => "text-extractor",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from external tool adapters.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool ran but the expected output artifact is missing.
    #[error("{tool} produced no output for {}", .input.display())]
    ToolFailure { tool: Tool, input: PathBuf },

    #[error("External tool not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A fully described external tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tool: Tool,
    pub program: String,
    pub args: Vec<OsString>,
    /// File the tool reads.
    pub input: PathBuf,
    /// File the tool is expected to create.
    pub output: PathBuf,
}

/// What came back from running an invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    pub stderr: String,
}

/// Executes tool invocations.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        debug!("Running {} {:?}", invocation.program, invocation.args);
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                if !output.status.success() {
                    debug!(
                        "{} exited with {} for {}: {}",
                        invocation.program,
                        output.status,
                        invocation.input.display(),
                        stderr.trim()
                    );
                }
                Ok(ToolOutput {
                    success: output.status.success(),
                    stderr,
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ToolError::NotFound(invocation.program.clone()))
            }
            Err(e) => Err(ToolError::Io(e)),
        }
    }
}

/// Run an invocation and verify its output artifact exists.
///
/// A leftover artifact from an interrupted earlier run is removed first so it
/// cannot pass for fresh output.
pub(crate) async fn run_checked(
    runner: &dyn CommandRunner,
    invocation: &Invocation,
) -> Result<(), ToolError> {
    match tokio::fs::remove_file(&invocation.output).await {
        Ok(()) => debug!("Removed stale {}", invocation.output.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(ToolError::Io(e)),
    }

    let output = runner.run(invocation).await?;

    if tokio::fs::try_exists(&invocation.output).await? {
        if !output.success {
            debug!(
                "{} reported failure but produced {}",
                invocation.tool,
                invocation.output.display()
            );
        }
        Ok(())
    } else {
        if !output.stderr.trim().is_empty() {
            warn!("{} stderr: {}", invocation.tool, output.stderr.trim());
        }
        Err(ToolError::ToolFailure {
            tool: invocation.tool,
            input: invocation.input.clone(),
        })
    }
}
