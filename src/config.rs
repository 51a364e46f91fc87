//! Configuration for paperintake.
//!
//! Everything is assembled from the command line / environment (see
//! [`crate::cli::Cli`]) into a validated [`Settings`]. Directory layout is
//! fixed relative to a root directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::llm::LlmConfig;
use crate::models::ProcessingMode;
use crate::ocr::OcrOptions;
use crate::rate_limit::BackoffPolicy;

/// Default settle delay after a filesystem event.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(10);

/// Ledger filename relative to the root directory.
pub const LEDGER_FILENAME: &str = "titles.json";

/// Errors raised while assembling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Stage directories and ledger location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    /// Normal-mode intake (`in/`).
    pub intake: PathBuf,
    /// Forced-mode intake (`force-processing/`).
    pub force_intake: PathBuf,
    pub cleaned: PathBuf,
    pub ocr: PathBuf,
    pub out: PathBuf,
    /// Title ledger (`titles.json`).
    pub ledger: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            intake: root.join("in"),
            force_intake: root.join("force-processing"),
            cleaned: root.join("cleaned"),
            ocr: root.join("ocr"),
            out: root.join("out"),
            ledger: root.join(LEDGER_FILENAME),
            root,
        }
    }

    /// Intake directory for a processing mode.
    pub fn intake_dir(&self, mode: ProcessingMode) -> &Path {
        match mode {
            ProcessingMode::Normal => &self.intake,
            ProcessingMode::Forced => &self.force_intake,
        }
    }

    /// Processing mode for a path inside one of the intake directories.
    pub fn mode_for(&self, path: &Path) -> Option<ProcessingMode> {
        let parent = path.parent()?;
        if parent == self.intake {
            Some(ProcessingMode::Normal)
        } else if parent == self.force_intake {
            Some(ProcessingMode::Forced)
        } else {
            None
        }
    }

    /// Create every directory of the layout if absent.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        for dir in [
            &self.intake,
            &self.force_intake,
            &self.cleaned,
            &self.ocr,
            &self.out,
        ] {
            fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Validated runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub layout: Layout,
    pub llm: LlmConfig,
    pub retry: BackoffPolicy,
    pub ocr: OcrOptions,
    /// Wait after a filesystem event before trusting the file.
    pub settle_delay: Duration,
    /// Process the start-up scan and exit instead of watching.
    pub once: bool,
}

/// Require a non-blank string setting.
pub(crate) fn require(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Missing(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let layout = Layout::new("/srv/scans");
        assert_eq!(layout.intake, PathBuf::from("/srv/scans/in"));
        assert_eq!(layout.force_intake, PathBuf::from("/srv/scans/force-processing"));
        assert_eq!(layout.ledger, PathBuf::from("/srv/scans/titles.json"));
        assert_eq!(layout.intake_dir(ProcessingMode::Forced), layout.force_intake);
    }

    #[test]
    fn test_mode_for() {
        let layout = Layout::new("/srv/scans");
        assert_eq!(
            layout.mode_for(Path::new("/srv/scans/in/a.pdf")),
            Some(ProcessingMode::Normal)
        );
        assert_eq!(
            layout.mode_for(Path::new("/srv/scans/force-processing/a.pdf")),
            Some(ProcessingMode::Forced)
        );
        assert_eq!(layout.mode_for(Path::new("/srv/scans/out/a.pdf")), None);
        assert_eq!(layout.mode_for(Path::new("/srv/scans/in/sub/a.pdf")), None);
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        layout.ensure_dirs().unwrap();
        for d in [&layout.intake, &layout.force_intake, &layout.cleaned, &layout.ocr, &layout.out] {
            assert!(d.is_dir(), "{} missing", d.display());
        }
        // Idempotent
        layout.ensure_dirs().unwrap();
        assert!(!layout.ledger.exists());
    }

    #[test]
    fn test_require() {
        assert_eq!(require(Some(" x ".into()), "K").unwrap(), "x");
        assert!(matches!(require(Some("  ".into()), "K"), Err(ConfigError::Missing("K"))));
        assert!(matches!(require(None, "K"), Err(ConfigError::Missing("K"))));
    }
}
