//! User preferences
//!
//! Settings are read once at startup and written back after every observed
//! change. A missing or unreadable file is never fatal: the defaults are used
//! and the problem is logged.

use crate::error::{Result, TelescopeError};
use crate::store::{SortDirection, SortKey, SortState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_SHORTCUT: &str = "CommandOrControl+Shift+V";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub global_shortcut: String,
    /// Start a lookup as soon as names are pasted
    pub auto_scan_on_shortcut: bool,
    pub sort_column: SortKey,
    pub sort_direction: SortDirection,
    pub overlay_locked: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            global_shortcut: DEFAULT_SHORTCUT.to_string(),
            auto_scan_on_shortcut: true,
            sort_column: SortKey::Threat,
            sort_direction: SortDirection::Desc,
            overlay_locked: false,
        }
    }
}

impl Settings {
    pub fn sort_state(&self) -> SortState {
        SortState::new(self.sort_column, self.sort_direction)
    }
}

/// On-disk shape: the settings live under a single `settings` key
#[derive(Debug, Serialize, Deserialize)]
struct SettingsFile {
    settings: Settings,
}

/// Persistence seam for settings
pub trait SettingsStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet
    fn load(&self) -> Result<Option<Settings>>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// JSON file store
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the platform data directory
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            TelescopeError::Settings("Cannot determine data directory".to_string())
        })?;

        Ok(data_dir.join("telescope").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<Option<Settings>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| TelescopeError::Io {
            source: e,
            context: format!("Failed to read settings file: {}", self.path.display()),
        })?;
        let file: SettingsFile =
            serde_json::from_str(&content).map_err(|e| TelescopeError::Json {
                source: e,
                context: format!("Failed to parse settings file: {}", self.path.display()),
            })?;

        Ok(Some(file.settings))
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TelescopeError::Io {
                source: e,
                context: format!("Failed to create settings directory: {}", parent.display()),
            })?;
        }

        let file = SettingsFile {
            settings: settings.clone(),
        };
        let content = serde_json::to_string_pretty(&file).map_err(|e| TelescopeError::Json {
            source: e,
            context: "Failed to serialize settings".to_string(),
        })?;
        std::fs::write(&self.path, content).map_err(|e| TelescopeError::Io {
            source: e,
            context: format!("Failed to write settings file: {}", self.path.display()),
        })?;

        Ok(())
    }
}

/// Current settings plus the store they are persisted to
pub struct SettingsManager {
    store: Arc<dyn SettingsStore>,
    current: Settings,
}

impl SettingsManager {
    /// Load settings, falling back to defaults on any failure
    pub fn load(store: Arc<dyn SettingsStore>) -> Self {
        let current = match store.load() {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                tracing::debug!("No stored settings, using defaults");
                Settings::default()
            }
            Err(e) => {
                tracing::warn!("Failed to load settings, using defaults: {}", e);
                Settings::default()
            }
        };

        Self { store, current }
    }

    pub fn get(&self) -> &Settings {
        &self.current
    }

    /// Apply `change` and persist if anything differs.
    ///
    /// Returns whether the settings changed. The in-memory value is kept even
    /// when saving fails.
    pub fn update<F>(&mut self, change: F) -> Result<bool>
    where
        F: FnOnce(&mut Settings),
    {
        let mut next = self.current.clone();
        change(&mut next);
        if next == self.current {
            return Ok(false);
        }

        self.current = next;
        self.store.save(&self.current)?;
        tracing::debug!("Settings saved");
        Ok(true)
    }

    /// Header click on a sortable column
    pub fn handle_sort(&mut self, key: SortKey) -> Result<SortState> {
        let mut state = self.current.sort_state();
        state.handle_sort(key);
        self.update(|s| {
            s.sort_column = state.key;
            s.sort_direction = state.direction;
        })?;
        Ok(state)
    }

    pub fn reset(&mut self) -> Result<()> {
        self.current = Settings::default();
        self.store.save(&self.current)
    }
}
