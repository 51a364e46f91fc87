//! Title ledger: every base name ever assigned to a delivered document.
//!
//! Persisted as a pretty-printed JSON array of strings. The file is re-read
//! on every query so independent processes sharing it stay convergent. An
//! unreadable or unparsable ledger is treated as empty.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while persisting the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File-backed, append-only list of assigned base names.
#[derive(Debug, Clone)]
pub struct TitleLedger {
    path: PathBuf,
}

impl TitleLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all recorded names in assignment order.
    ///
    /// A missing ledger is empty; so is a corrupt one.
    pub fn load(&self) -> Vec<String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(
                    "Could not read title ledger {}: {}; treating as empty",
                    self.path.display(),
                    e
                );
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&content) {
            Ok(titles) => titles,
            Err(e) => {
                warn!(
                    "Title ledger {} is not a JSON string array ({}); treating as empty",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Whether `name` has been assigned before.
    pub fn exists(&self, name: &str) -> bool {
        self.load().iter().any(|t| t == name)
    }

    /// Record `name` as assigned.
    pub fn append(&self, name: &str) -> Result<(), LedgerError> {
        let mut titles = self.load();
        titles.push(name.to_string());
        self.store(&titles)?;
        debug!("Recorded '{}' in title ledger ({} entries)", name, titles.len());
        Ok(())
    }

    /// Write an empty ledger if none exists or the current one is unparsable.
    pub fn initialize(&self) -> Result<(), LedgerError> {
        let valid = fs::read_to_string(&self.path)
            .ok()
            .is_some_and(|c| serde_json::from_str::<Vec<String>>(&c).is_ok());
        if !valid {
            self.store(&[])?;
        }
        Ok(())
    }

    /// Replace the ledger atomically (temp file + rename in the same directory).
    fn store(&self, titles: &[String]) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(titles)?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let io_err = |source| LedgerError::Io {
            path: self.path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}
