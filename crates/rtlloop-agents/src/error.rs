//! Error types for model-backed collaborators

use thiserror::Error;

pub type AgentResult<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The reply could not be coerced into the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Model request failed: {0}")]
    Transport(String),

    #[error("No API key set (looked in {0})")]
    MissingApiKey(String),

    #[error("Model returned no text")]
    EmptyResponse,
}

impl AgentError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, AgentError::MalformedResponse(_))
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::MalformedResponse(err.to_string())
    }
}
