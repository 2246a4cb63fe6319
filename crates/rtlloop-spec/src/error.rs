//! Error types for specification parsing and validation

use thiserror::Error;

/// Result type for specification operations
pub type Result<T> = std::result::Result<T, SpecError>;

/// Errors that can occur while loading a specification record
#[derive(Debug, Error)]
pub enum SpecError {
    /// I/O error reading a specification file
    #[error("I/O error: {0}")]
    Io(String),

    /// The input is not JSON, or a field has the wrong shape
    #[error("Failed to parse specification: {0}")]
    Parse(String),

    /// One or more validation problems; all of them are reported
    #[error("Invalid specification: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// Action category name outside the known set
    #[error("Unknown action category: {0}")]
    UnknownAction(String),
}

impl SpecError {
    /// Individual validation problems, empty for other error kinds
    pub fn problems(&self) -> &[String] {
        match self {
            SpecError::Invalid(problems) => problems,
            _ => &[],
        }
    }
}
