use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Telescope
#[derive(Error, Debug)]
pub enum TelescopeError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Lookup session errors
    #[error("Session error: {0}")]
    Session(String),

    /// The lookup engine rejected or failed a request
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// Event channel plumbing errors
    #[error("Channel error: {0}")]
    Channel(String),

    /// Window runtime or window manager errors
    #[error("Window error: {0}")]
    Window(String),

    /// Settings persistence errors
    #[error("Settings error: {0}")]
    Settings(String),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for Telescope operations
pub type Result<T> = std::result::Result<T, TelescopeError>;
