//! Core error types for bodydouble-core.
//!
//! Only fatal or caller-visible failures are modelled here. Protocol errors
//! coming from the agent (bad acks, unknown tasks) never surface as `Err`:
//! they are turned into `error` prompts on the queue instead.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for bodydouble-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The desktop notification tool is missing from PATH
    #[error("'{command}' not found. Install libnotify (e.g. 'pacman -S libnotify' on Arch, 'apt install libnotify-bin' on Debian/Ubuntu)")]
    NotifierUnavailable { command: String },

    /// The data directory could not be resolved or created
    #[error("Data directory error: {0}")]
    DataDir(String),

    /// A document on disk could not be decoded
    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors (prompt queue)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML errors (session, log, tasks, due items)
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_bw::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
