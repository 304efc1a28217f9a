//! Persisted defaults for new matches.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SettingsError;
use crate::host::SettingsStore;

/// The only durable preference: whether captures are mandatory by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mandatory_captures: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mandatory_captures: true,
        }
    }
}

/// Stores settings as pretty JSON. Writes go to a temporary file in the same
/// directory which then replaces the target, so readers never see a partial
/// file.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    /// A missing file yields the defaults.
    fn load(&self) -> Result<Settings, SettingsError> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }

        let data = fs::read_to_string(&self.path).map_err(|source| SettingsError::Read {
            path: self.path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&data)?)
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let write_err = |source: std::io::Error| SettingsError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_err)?;

        let json = serde_json::to_string_pretty(settings)?;
        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        temp.write_all(json.as_bytes()).map_err(write_err)?;
        temp.flush().map_err(write_err)?;
        temp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Keeps settings in memory only.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        Ok(*self
            .settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        *self
            .settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = *settings;
        Ok(())
    }
}
