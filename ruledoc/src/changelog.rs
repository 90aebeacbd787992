//! Changelog entries and the sinks that record them

use crate::section_id::SectionId;
use chrono::{Local, NaiveDate};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Title used at save time for a dirty section without a heading
pub const UNTITLED_CHANGE_TITLE: &str = "Updated item";

/// One user-facing record of a saved or created section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    /// Calendar day of the change
    pub date: NaiveDate,
    /// Nearest heading text of the section
    pub title: String,
    /// Fragment reference to the section (`#id`)
    pub anchor: String,
}

impl ChangelogEntry {
    /// Build an entry for a section dated today
    pub fn today(title: impl Into<String>, section: &SectionId) -> Self {
        Self::on(Local::now().date_naive(), title, section)
    }

    /// Build an entry for a section on a given day
    pub fn on(date: NaiveDate, title: impl Into<String>, section: &SectionId) -> Self {
        Self {
            date,
            title: title.into(),
            anchor: section.anchor(),
        }
    }
}

impl fmt::Display for ChangelogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "【{}】{} ({})",
            self.date.format("%m/%d"),
            self.title,
            self.anchor
        )
    }
}

/// Errors raised by changelog sinks
#[derive(Error, Debug)]
pub enum ChangelogError {
    /// The changelog file could not be written
    #[error("Failed to write changelog {path}: {source}", path = .path.display())]
    Write {
        /// Changelog file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Consumer of changelog entries, in emission order
pub trait ChangelogSink {
    /// Record a batch of entries
    fn emit(&mut self, entries: &[ChangelogEntry]) -> Result<(), ChangelogError>;
}

/// Keeps every emitted entry in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryChangelog {
    entries: Vec<ChangelogEntry>,
}

impl MemoryChangelog {
    /// Create an empty changelog
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries received so far, oldest first
    pub fn entries(&self) -> &[ChangelogEntry] {
        &self.entries
    }
}

impl ChangelogSink for MemoryChangelog {
    fn emit(&mut self, entries: &[ChangelogEntry]) -> Result<(), ChangelogError> {
        self.entries.extend_from_slice(entries);
        Ok(())
    }
}

/// Appends one Markdown list item per entry to a file
#[derive(Debug, Clone)]
pub struct FileChangelog {
    path: PathBuf,
}

impl FileChangelog {
    /// Create a sink writing to `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the changelog file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, entries: &[ChangelogEntry]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        for entry in entries {
            writeln!(
                file,
                "- 【{}】[{}]({})",
                entry.date.format("%m/%d"),
                entry.title,
                entry.anchor
            )?;
        }
        Ok(())
    }
}

impl ChangelogSink for FileChangelog {
    fn emit(&mut self, entries: &[ChangelogEntry]) -> Result<(), ChangelogError> {
        self.append(entries).map_err(|source| ChangelogError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
