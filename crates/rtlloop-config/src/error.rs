//! Error types for settings parsing and validation

use thiserror::Error;

/// Result type for settings operations
pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading the settings file
    #[error("I/O error: {0}")]
    Io(String),

    /// TOML parsing error
    #[error("Failed to parse settings: {0}")]
    Parse(String),

    /// One or more values out of range
    #[error("Invalid settings: {}", .0.join("; "))]
    Validation(Vec<String>),
}
