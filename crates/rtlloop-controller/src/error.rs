//! Error types for the control loop

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures outside the state machine itself
///
/// A run that starts always ends in PASS or FAIL; these are raised only when
/// the working directory cannot be used.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error in {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
