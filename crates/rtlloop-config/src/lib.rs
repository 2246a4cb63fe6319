//! rtlloop settings
//!
//! Parses the optional `rtlloop.toml` holding the text model choice, the
//! pipeline retry budget and the per-tool time budgets. Missing sections
//! and fields take their defaults.

pub mod error;
pub mod settings;

pub use error::{ConfigError, Result};
pub use settings::{ModelSettings, PipelineSettings, Settings, ToolSettings, WORK_DIR_ENV};

use std::path::Path;

/// Default settings file name
pub const SETTINGS_FILE: &str = "rtlloop.toml";

/// Parse settings from a file path
pub fn from_path(path: impl AsRef<Path>) -> Result<Settings> {
    let contents =
        std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
    from_str(&contents)
}

/// Parse settings from a string
pub fn from_str(s: &str) -> Result<Settings> {
    toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Load, apply environment overrides and validate
///
/// Without an explicit path, `rtlloop.toml` in the current directory is read
/// when present; otherwise defaults are used.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let mut settings = match path {
        Some(path) => from_path(path)?,
        None if Path::new(SETTINGS_FILE).is_file() => from_path(SETTINGS_FILE)?,
        None => Settings::default(),
    };
    settings.apply_env();
    settings.validate()?;
    Ok(settings)
}
