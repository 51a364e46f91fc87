//! Document identity, processing mode and stage model.
//!
//! A document is identified by its filename. Its current owner is the stage
//! directory it lives in; moving between stages is a rename followed by
//! removal from the old location once the new copy is confirmed.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Layout;

/// How a document is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingMode {
    /// OCR only when the cleaned PDF has no text layer.
    Normal,
    /// Always re-clean and re-OCR, even over an existing text layer.
    Forced,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Forced => "forced",
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, Self::Forced)
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory that currently owns a document's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// `in/` or `force-processing/`, depending on the mode.
    Intake,
    /// `cleaned/`
    Cleaned,
    /// `ocr/`
    Ocr,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Cleaned => "cleaned",
            Self::Ocr => "ocr",
        }
    }
}

/// Position of a document in the processing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Intake,
    Cleaned,
    Ocrd,
    PassThrough,
    TextExtracted,
    Classified,
    Named,
    Delivered,
}

impl DocumentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Cleaned => "cleaned",
            Self::Ocrd => "ocr'd",
            Self::PassThrough => "pass-through",
            Self::TextExtracted => "text-extracted",
            Self::Classified => "classified",
            Self::Named => "named",
            Self::Delivered => "delivered",
        }
    }
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document waiting in, or moving through, the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Document {
    /// Filename, including the `.pdf` extension.
    pub filename: String,
    pub mode: ProcessingMode,
}

impl Document {
    pub fn new(filename: impl Into<String>, mode: ProcessingMode) -> Self {
        Self {
            filename: filename.into(),
            mode,
        }
    }

    /// Build a document from a path inside one of the intake directories.
    ///
    /// Returns `None` if the path has no usable filename.
    pub fn from_path(path: &Path, mode: ProcessingMode) -> Option<Self> {
        let filename = path.file_name()?.to_str()?;
        Some(Self::new(filename, mode))
    }

    /// Location of this document's artifact in the given stage.
    pub fn path_in(&self, layout: &Layout, stage: Stage) -> PathBuf {
        match stage {
            Stage::Intake => layout.intake_dir(self.mode).join(&self.filename),
            Stage::Cleaned => layout.cleaned.join(&self.filename),
            Stage::Ocr => layout.ocr.join(&self.filename),
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.filename, self.mode)
    }
}

/// One unit of work for the intake queue.
pub type QueueItem = Document;
