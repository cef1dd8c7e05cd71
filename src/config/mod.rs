//! Configuration management for Telescope
//!
//! Loaded from a TOML file, then environment overrides, then validation.

use crate::error::{Result, TelescopeError};
use crate::sync::ResyncScope;
use crate::window::{OverlayGeometry, WindowOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Event channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Messages buffered per subscriber before it starts lagging
    pub capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: crate::channel::DEFAULT_CAPACITY,
        }
    }
}

/// Fixture replay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Pause between streamed results, e.g. "25ms"
    pub event_delay: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            event_delay: "0ms".to_string(),
        }
    }
}

/// Overlay window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub label: String,
    pub resync_scope: ResyncScope,
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub always_on_top: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        let geometry = OverlayGeometry::default();
        Self {
            label: "overlay".to_string(),
            resync_scope: ResyncScope::Full,
            width: geometry.width,
            height: geometry.height,
            min_width: geometry.min_width,
            min_height: geometry.min_height,
            always_on_top: geometry.always_on_top,
        }
    }
}

impl OverlayConfig {
    pub fn geometry(&self) -> OverlayGeometry {
        OverlayGeometry {
            width: self.width,
            height: self.height,
            min_width: self.min_width,
            min_height: self.min_height,
            always_on_top: self.always_on_top,
        }
    }

    pub fn window_options(&self) -> WindowOptions {
        WindowOptions::overlay(self.label.clone(), self.resync_scope)
    }
}

/// Settings file location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Defaults to the platform data directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TelescopeError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| TelescopeError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load from `path`, or defaults (plus env overrides) when the file is missing
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(TelescopeError::ConfigNotFound { .. }) => {
                tracing::warn!("Config file not found at {:?}, using defaults", path);
                let mut config = Config::default();
                config.apply_env_overrides();
                ConfigValidator::validate(&config)?;
                Ok(config)
            }
            other => other,
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TelescopeError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| TelescopeError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: TELESCOPE_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix("TELESCOPE_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "CHANNEL__CAPACITY" => {
                self.channel.capacity = parse_value(path, value)?;
            }
            "LOOKUP__EVENT_DELAY" => {
                self.lookup.event_delay = value.to_string();
            }
            "OVERLAY__LABEL" => {
                self.overlay.label = value.to_string();
            }
            "OVERLAY__RESYNC_SCOPE" => {
                self.overlay.resync_scope =
                    ResyncScope::parse(value).ok_or_else(|| TelescopeError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Expected 'full' or 'filtered', got '{}'", value),
                    })?;
            }
            "OVERLAY__ALWAYS_ON_TOP" => {
                self.overlay.always_on_top = parse_value(path, value)?;
            }
            "SETTINGS__PATH" => {
                self.settings.path = Some(PathBuf::from(value));
            }
            "LOGGING__LEVEL" => {
                self.logging.level = value.to_string();
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Replay delay as a duration
    pub fn event_delay(&self) -> Result<Duration> {
        parse_duration(&self.lookup.event_delay).ok_or_else(|| TelescopeError::InvalidConfigValue {
            path: "lookup.event_delay".to_string(),
            message: format!("Invalid duration format: {}", self.lookup.event_delay),
        })
    }

    /// Settings file path, falling back to the platform default
    pub fn settings_path(&self) -> Result<PathBuf> {
        match &self.settings.path {
            Some(path) => Ok(path.clone()),
            None => crate::settings::JsonSettingsStore::default_path(),
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            TelescopeError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("telescope").join("config.toml"))
    }
}

fn parse_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TelescopeError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}'", value),
        })
}

/// Parse durations like "250ms", "5s", "2m" or bare milliseconds
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let amount: u64 = digits.parse().ok()?;

    match unit {
        "" | "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_secs(amount * 60)),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            channel: ChannelConfig::default(),
            lookup: LookupConfig::default(),
            overlay: OverlayConfig::default(),
            settings: SettingsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
