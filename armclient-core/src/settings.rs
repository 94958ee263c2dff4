//! Persisted settings: the active tenant.
//!
//! The settings record is a single JSON document stored in the platform
//! configuration directory:
//!
//! - Linux: `~/.config/armclient/settings.json`
//! - macOS: `~/Library/Application Support/com.armclient.armclient/settings.json`
//! - Windows: `%APPDATA%\armclient\armclient\config\settings.json`
//!
//! Callers hold an explicit [`SettingsStore`] handle; tests substitute
//! [`MemorySettingsStore`].

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SETTINGS_FILE: &str = "settings.json";

/// Error type for settings persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error reading or writing the settings file.
    #[error("failed to access settings at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The settings file exists but is not valid JSON.
    #[error("settings file {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration directory not available.
    #[error("configuration directory not available")]
    ConfigDirUnavailable,
}

/// Persisted, process-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Tenant used when none is given explicitly. Empty when never set.
    #[serde(default)]
    pub active_tenant_id: String,
}

impl Settings {
    pub fn new(active_tenant_id: impl Into<String>) -> Self {
        Self {
            active_tenant_id: active_tenant_id.into(),
        }
    }

    /// The active tenant, if one was ever selected.
    pub fn active_tenant(&self) -> Option<&str> {
        let tenant = self.active_tenant_id.trim();
        (!tenant.is_empty()).then_some(tenant)
    }
}

/// Read/write access to the persisted [`Settings`].
///
/// No locking is performed; concurrent writers race and the last write wins.
pub trait SettingsStore: Send + Sync {
    /// Read the settings, or `Settings::default()` when nothing was persisted yet.
    fn read(&self) -> Result<Settings, StorageError>;

    /// Persist `settings`, replacing any prior content.
    fn write(&self, settings: &Settings) -> Result<(), StorageError>;
}

/// JSON file backed settings store.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    /// Get the default storage path for the settings file.
    pub fn default_path() -> Result<PathBuf, StorageError> {
        let dirs = directories::ProjectDirs::from("com", "armclient", "armclient")
            .ok_or(StorageError::ConfigDirUnavailable)?;

        Ok(dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Open the settings store at the default location.
    ///
    /// Nothing is touched on disk until the first write.
    pub fn open_default() -> Result<Self, StorageError> {
        Ok(Self::at_path(Self::default_path()?))
    }

    /// Open the settings store at a specific path.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the storage path for this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsStore for FileSettingsStore {
    fn read(&self) -> Result<Settings, StorageError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No settings file at {:?}, using defaults", self.path);
                return Ok(Settings::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, settings: &Settings) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let contents = serde_json::to_string_pretty(settings).map_err(|source| {
            StorageError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, contents).map_err(|e| self.io_error(e))?;

        tracing::info!(
            "Saved active tenant '{}' to {:?}",
            settings.active_tenant_id,
            self.path
        );
        Ok(())
    }
}

/// In-memory settings store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: RwLock<Option<Settings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `settings`.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(Some(settings)),
        }
    }

    /// Whether anything was ever written.
    pub fn is_written(&self) -> bool {
        self.settings.read().is_some()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn read(&self) -> Result<Settings, StorageError> {
        Ok(self.settings.read().clone().unwrap_or_default())
    }

    fn write(&self, settings: &Settings) -> Result<(), StorageError> {
        *self.settings.write() = Some(settings.clone());
        Ok(())
    }
}
