//! rtlloop generative collaborators
//!
//! The control loop depends on two capabilities:
//!
//! - [`Writer`]: specification in, first RTL + testbench out
//! - [`Reviewer`]: previous artifacts plus tool reports in, repaired artifacts out
//!
//! Either may fail with [`AgentError::MalformedResponse`] when the reply cannot
//! be coerced into the expected shape. [`LlmWriter`] and [`LlmReviewer`]
//! implement them on top of any [`TextModel`]; [`Canonicalizer`] turns free
//! text into a [`SpecRecord`](rtlloop_spec::SpecRecord) with the same model.

pub mod canonicalizer;
pub mod error;
pub mod model;
pub mod response;
pub mod reviewer;
pub mod writer;

pub use canonicalizer::Canonicalizer;
pub use error::{AgentError, AgentResult};
pub use model::{api_key_from_env, GeminiModel, TextModel, DEFAULT_API_KEY_VARS, DEFAULT_MODEL};
pub use reviewer::LlmReviewer;
pub use writer::LlmWriter;

use async_trait::async_trait;
use rtlloop_spec::{ActionCategory, SpecRecord};
use rtlloop_tools::ToolOutput;
use serde::{Deserialize, Serialize};

/// First-attempt artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedDesign {
    pub module_name: String,
    pub rtl_code: String,
    pub testbench_code: String,
    #[serde(default)]
    pub explanation: String,
}

/// Everything the reviewer sees about the attempt being repaired
#[derive(Debug, Clone, Copy)]
pub struct RepairRequest<'a> {
    pub spec: &'a SpecRecord,
    pub rtl_code: &'a str,
    pub testbench_code: &'a str,
    pub compile_result: &'a ToolOutput,
    /// Absent when compilation failed
    pub run_result: Option<&'a ToolOutput>,
    pub action: ActionCategory,
    /// Attempt number of the repair being requested
    pub attempt: u32,
    pub max_retries: u32,
}

/// Repaired artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairedDesign {
    /// `None` keeps the previous module name
    #[serde(default)]
    pub module_name: Option<String>,
    pub rtl_code: String,
    pub testbench_code: String,
    #[serde(default)]
    pub changes_made: String,
}

/// Generation collaborator
#[async_trait]
pub trait Writer: Send + Sync {
    async fn generate(&self, spec: &SpecRecord) -> AgentResult<GeneratedDesign>;
}

/// Repair collaborator
#[async_trait]
pub trait Reviewer: Send + Sync {
    async fn repair(&self, request: &RepairRequest<'_>) -> AgentResult<RepairedDesign>;
}
