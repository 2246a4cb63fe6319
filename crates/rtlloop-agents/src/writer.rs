//! Generation collaborator over a text model

use crate::error::{AgentError, AgentResult};
use crate::model::TextModel;
use crate::response::{parse_reply, require_code};
use crate::{GeneratedDesign, Writer};
use async_trait::async_trait;
use rtlloop_spec::SpecRecord;
use serde::Deserialize;
use std::sync::Arc;

/// Reply shape before required fields are checked
#[derive(Deserialize)]
struct WriterReply {
    #[serde(default)]
    module_name: String,
    #[serde(default)]
    rtl_code: String,
    #[serde(default)]
    testbench_code: String,
    #[serde(default)]
    explanation: String,
}

pub struct LlmWriter {
    model: Arc<dyn TextModel>,
}

impl LlmWriter {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    pub fn prompt(spec: &SpecRecord) -> String {
        format!(
            r#"You are an expert RTL design engineer using SystemVerilog/Verilog.

Given this structured hardware specification, generate:
1. A synthesizable RTL module (DUT) that implements the spec exactly
2. A self-contained Icarus Verilog-compatible testbench that:
   - Instantiates the DUT
   - Applies test vectors (use truth_table if provided, else exhaustive/sampling)
   - Uses $display to print results
   - Ends with $finish
   - Uses only Icarus-compatible constructs (no $fatal, no assertions)

SPECIFICATION:
{summary}

Respond ONLY in this exact JSON format:
{{
  "module_name": "<top module name>",
  "rtl_code": "<full Verilog/SV code for DUT>",
  "testbench_code": "<full Verilog/SV testbench code>",
  "explanation": "<brief explanation of the design>"
}}

Output ONLY the JSON. No markdown, no backticks."#,
            summary = spec.summary()
        )
    }
}

/// Check a raw writer reply
pub fn parse_generated(raw: &str) -> AgentResult<GeneratedDesign> {
    let reply: WriterReply = parse_reply(raw)?;
    if reply.module_name.trim().is_empty() {
        return Err(AgentError::MalformedResponse(
            "reply has no module_name".to_string(),
        ));
    }
    require_code("rtl_code", &reply.rtl_code)?;
    require_code("testbench_code", &reply.testbench_code)?;

    Ok(GeneratedDesign {
        module_name: reply.module_name.trim().to_string(),
        rtl_code: reply.rtl_code,
        testbench_code: reply.testbench_code,
        explanation: reply.explanation,
    })
}

#[async_trait]
impl Writer for LlmWriter {
    async fn generate(&self, spec: &SpecRecord) -> AgentResult<GeneratedDesign> {
        let raw = self.model.generate(&Self::prompt(spec)).await?;
        parse_generated(&raw)
    }
}
