//! Text model backends
//!
//! Collaborators only need "prompt in, text out". [`GeminiModel`] talks to
//! the Generative Language REST API; tests substitute canned replies.

use crate::error::{AgentError, AgentResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default hosted model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

/// Environment variables searched for an API key, in order
pub const DEFAULT_API_KEY_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A generative text model
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> AgentResult<String>;
}

/// Read the first non-empty API key among `vars`
pub fn api_key_from_env<S: AsRef<str>>(vars: &[S]) -> AgentResult<String> {
    vars.iter()
        .filter_map(|var| std::env::var(var.as_ref()).ok())
        .find(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            let names: Vec<&str> = vars.iter().map(AsRef::as_ref).collect();
            AgentError::MissingApiKey(names.join(", "))
        })
}

/// Gemini `generateContent` client
pub struct GeminiModel {
    model: String,
    api_key: String,
    base_url: String,
    client: Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

impl GeminiModel {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> AgentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: API_BASE.to_string(),
            client,
        })
    }

    /// Point the client at a different endpoint root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl TextModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> AgentResult<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        log::debug!("requesting {} ({} prompt chars)", self.model, prompt.len());
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Transport(format!("HTTP {}: {}", status, detail)));
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed.text().ok_or(AgentError::EmptyResponse)
    }
}
