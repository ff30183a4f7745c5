//! `wellsync.toml` loading

use crate::errors::CliError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wellsync_queue::QueueConfig;

/// File name looked up in the user's config directory
pub const CONFIG_FILE_NAME: &str = "wellsync.toml";

/// Settings read from `wellsync.toml`
///
/// ```toml
/// [queue]
/// debounce_ms = 500
/// max_attempts = 3
/// retry_delay_ms = 1000
///
/// [storage]
/// dir = "/var/lib/wellsync"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WellsyncConfig {
    /// Queue timing and retries
    pub queue: QueueConfig,
    /// Where values are stored
    pub storage: StorageSettings,
}

/// `[storage]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSettings {
    /// Directory for the file store; defaults to the user data directory
    pub dir: Option<PathBuf>,
}

impl WellsyncConfig {
    /// `<config_dir>/wellsync/wellsync.toml`, if the platform has a config dir
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wellsync").join(CONFIG_FILE_NAME))
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// read if present and defaults are used otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the file cannot be read, does not parse,
    /// or holds invalid queue settings.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    ::tracing::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            CliError::config_with_help(
                format!("Failed to read {}: {e}", path.display()),
                "Pass an existing file with --config or omit it to use defaults",
            )
        })?;

        let config = Self::parse(&contents)
            .map_err(|e| CliError::config(format!("{}: {e}", path.display())))?;
        ::tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Parse and validate TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] for malformed TOML, unknown keys, or
    /// invalid queue settings.
    pub fn parse(contents: &str) -> Result<Self, CliError> {
        let config: Self = toml::from_str(contents).map_err(|e| CliError::config(e.to_string()))?;
        config
            .queue
            .validate()
            .map_err(|e| CliError::config(e.to_string()))?;
        Ok(config)
    }

    /// Storage directory: the configured one, else `<data_dir>/wellsync`
    #[must_use]
    pub fn storage_dir(&self) -> PathBuf {
        self.storage.dir.clone().unwrap_or_else(|| {
            dirs::data_dir().map_or_else(|| PathBuf::from(".wellsync"), |dir| dir.join("wellsync"))
        })
    }
}
