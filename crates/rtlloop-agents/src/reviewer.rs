//! Repair collaborator over a text model

use crate::error::AgentResult;
use crate::model::TextModel;
use crate::response::{parse_reply, require_code};
use crate::{RepairRequest, RepairedDesign, Reviewer};
use async_trait::async_trait;
use rtlloop_tools::ToolOutput;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
struct ReviewerReply {
    #[serde(default)]
    module_name: Option<String>,
    #[serde(default)]
    rtl_code: String,
    #[serde(default)]
    testbench_code: String,
    #[serde(default)]
    changes_made: String,
}

pub struct LlmReviewer {
    model: Arc<dyn TextModel>,
}

fn compile_report(out: &ToolOutput) -> String {
    format!(
        "Return code: {}\nSTDERR:\n{}\nSTDOUT:\n{}",
        out.returncode, out.stderr, out.stdout
    )
}

fn simulation_report(out: Option<&ToolOutput>) -> String {
    match out {
        Some(out) => format!(
            "Return code: {}\nSTDOUT:\n{}\nSTDERR:\n{}",
            out.returncode, out.stdout, out.stderr
        ),
        None => "Simulation did not run (compile failed).".to_string(),
    }
}

impl LlmReviewer {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    pub fn prompt(request: &RepairRequest<'_>) -> String {
        format!(
            r#"You are an expert RTL debug engineer.

SPECIFICATION:
{summary}

This is attempt {attempt} of {max_retries}. The verification failed.
FOCUS: {focus}
Fix ONLY what is broken. Do NOT rewrite from scratch unless necessary.
Use Icarus-compatible constructs (-g2012).

CURRENT RTL (DUT):
{rtl}

CURRENT TESTBENCH:
{tb}

COMPILE RESULT:
{compile}

SIMULATION RESULT:
{sim}

Respond ONLY in this JSON format:
{{
  "module_name": "<top module name>",
  "rtl_code": "<fixed Verilog/SV code for DUT>",
  "testbench_code": "<fixed Verilog/SV testbench code>",
  "changes_made": "<bullet list of what you changed>"
}}

Output ONLY the JSON. No markdown."#,
            summary = request.spec.summary(),
            attempt = request.attempt,
            max_retries = request.max_retries,
            focus = request.action.repair_focus(),
            rtl = request.rtl_code,
            tb = request.testbench_code,
            compile = compile_report(request.compile_result),
            sim = simulation_report(request.run_result),
        )
    }
}

pub fn parse_repaired(raw: &str) -> AgentResult<RepairedDesign> {
    let reply: ReviewerReply = parse_reply(raw)?;
    require_code("rtl_code", &reply.rtl_code)?;
    require_code("testbench_code", &reply.testbench_code)?;

    Ok(RepairedDesign {
        module_name: reply
            .module_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()),
        rtl_code: reply.rtl_code,
        testbench_code: reply.testbench_code,
        changes_made: reply.changes_made,
    })
}

#[async_trait]
impl Reviewer for LlmReviewer {
    async fn repair(&self, request: &RepairRequest<'_>) -> AgentResult<RepairedDesign> {
        log::debug!(
            "repair request for attempt {} ({})",
            request.attempt,
            request.action
        );
        let raw = self.model.generate(&Self::prompt(request)).await?;
        parse_repaired(&raw)
    }
}
