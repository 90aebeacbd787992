//! Editor configuration from ruledoc.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name, looked up next to the document
pub const CONFIG_FILE_NAME: &str = "ruledoc.toml";

/// Default changelog file name, placed next to the document
pub const DEFAULT_CHANGELOG_FILE: &str = "CHANGELOG.md";

/// What dirtiness is measured against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaselineMode {
    /// The document as it was last saved (or loaded)
    #[default]
    LastSaved,
    /// The history entry under the cursor when the edit is recorded
    HistoryCursor,
}

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period before a burst of typing is snapshotted
    pub debounce_ms: u64,

    /// Period of the automatic checkpoint while editing with unsaved changes
    pub autosave_secs: u64,

    /// Maximum number of history entries kept (unset = unbounded)
    pub history_limit: Option<usize>,

    /// Dirty-tracking baseline
    pub baseline: BaselineMode,

    /// Changelog file, relative to the document directory
    pub changelog_path: Option<String>,

    /// Changelog title recorded when a section is inserted
    pub new_section_title: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            autosave_secs: 30,
            history_limit: None,
            baseline: BaselineMode::default(),
            changelog_path: None,
            new_section_title: "Added new section".to_string(),
        }
    }
}

impl EditorConfig {
    /// Load configuration from a ruledoc.toml file
    ///
    /// # Parameters
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(EditorConfig)` - Successfully loaded configuration
    /// * `Err(ConfigError)` - Error reading or parsing the configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(ConfigError::IoError)?;

        let config: EditorConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;

        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if !path.as_ref().exists() {
            log::debug!(
                "No config at {}, using defaults",
                path.as_ref().display()
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save configuration to a ruledoc.toml file
    ///
    /// # Parameters
    /// * `path` - Path where the configuration file will be written
    ///
    /// # Returns
    /// * `Ok(())` - Successfully saved configuration
    /// * `Err(ConfigError)` - Error serializing or writing the configuration file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;

        fs::write(&path, content).map_err(ConfigError::IoError)?;

        Ok(())
    }

    /// Debounce window for typing snapshots
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Period of the automatic checkpoint
    pub fn autosave_period(&self) -> Duration {
        Duration::from_secs(self.autosave_secs)
    }

    /// Changelog location for a document at `document_path`
    pub fn changelog_file(&self, document_path: &Path) -> PathBuf {
        let dir = document_path.parent().unwrap_or_else(|| Path::new(""));
        dir.join(
            self.changelog_path
                .as_deref()
                .unwrap_or(DEFAULT_CHANGELOG_FILE),
        )
    }
}

/// Errors that can occur when loading or saving editor configuration
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum ConfigError {
    /// IO error when reading or writing file
    IoError(std::io::Error),

    /// Error parsing TOML
    ParseError(toml::de::Error),

    /// Error serializing to TOML
    SerializeError(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "TOML parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "TOML serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
