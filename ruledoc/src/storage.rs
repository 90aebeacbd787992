//! Persistence sinks for saved documents

use crate::document::DocumentState;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while persisting a document
#[derive(Error, Debug)]
pub enum PersistError {
    /// The target file could not be written
    #[error("IO error writing {path}: {source}", path = .path.display())]
    Io {
        /// Target path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The sink refused the state
    #[error("Persistence rejected: {0}")]
    Rejected(String),
}

/// Destination for saved document states
pub trait PersistenceSink {
    /// Store the state; only `Ok` counts as a completed save
    fn persist(&mut self, state: &DocumentState) -> Result<(), PersistError>;
}

/// Writes the document to a file
///
/// The text is written to a sibling temporary file first and then renamed
/// over the target, so a failed write leaves the previous file intact.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Create a sink writing to `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Target path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl PersistenceSink for FileSink {
    fn persist(&mut self, state: &DocumentState) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut temp_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);

        fs::write(&temp_path, state.as_str()).map_err(|e| self.io_error(e))?;
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(self.io_error(e));
        }

        log::info!("Wrote {} bytes to {}", state.len(), self.path.display());
        Ok(())
    }
}

/// Keeps persisted states in memory; can be switched to fail
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    saved: Vec<DocumentState>,
    fail_with: Option<String>,
}

impl MemorySink {
    /// Create an empty, succeeding sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `persist` fail with the given reason
    pub fn fail_with(&mut self, reason: impl Into<String>) {
        self.fail_with = Some(reason.into());
    }

    /// Make `persist` succeed again
    pub fn recover(&mut self) {
        self.fail_with = None;
    }

    /// Most recently persisted state
    pub fn last(&self) -> Option<&DocumentState> {
        self.saved.last()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saved.len()
    }
}

impl PersistenceSink for MemorySink {
    fn persist(&mut self, state: &DocumentState) -> Result<(), PersistError> {
        if let Some(reason) = &self.fail_with {
            return Err(PersistError::Rejected(reason.clone()));
        }
        self.saved.push(state.clone());
        Ok(())
    }
}
