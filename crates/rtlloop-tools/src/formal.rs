//! SymbiYosys bounded model check adapter
//!
//! Optional: when `sby` is not installed the check reports itself as
//! unavailable instead of failing.

use crate::probe::ToolAvailability;
use crate::runner::{relative_to, run_tool_captured, write_input};
use crate::{ToolKind, ToolOutput};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const SBY_FILE: &str = "formal.sby";

/// Default unrolling depth for the bounded model check
pub const DEFAULT_DEPTH: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormalOutput {
    pub available: bool,
    /// `None` when the check did not run
    pub passed: Option<bool>,
    pub output: ToolOutput,
}

impl FormalOutput {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            passed: None,
            output: ToolOutput::new(
                crate::EXIT_NOT_FOUND,
                "",
                "SymbiYosys (sby) not installed",
            ),
        }
    }
}

pub fn sby_config(dut_name: &str, top: &str, depth: u32) -> String {
    format!(
        "[options]\nmode bmc\ndepth {depth}\n\n\
         [engines]\nsmtbmc\n\n\
         [script]\nread_verilog -sv {dut_name}\nprep -top {top}\n\n\
         [files]\n{dut_name}\n"
    )
}

/// Run a bounded model check of the design's embedded assertions
pub async fn run_formal(
    dut: &Path,
    top: &str,
    work_dir: &Path,
    depth: u32,
    availability: &ToolAvailability,
    timeout: Duration,
) -> FormalOutput {
    if !availability.is_available(ToolKind::Formal) {
        return FormalOutput::unavailable();
    }

    let dut_name = relative_to(dut, work_dir).to_string_lossy().to_string();
    if let Err(output) = write_input(&work_dir.join(SBY_FILE), &sby_config(&dut_name, top, depth)).await {
        return FormalOutput {
            available: true,
            passed: None,
            output,
        };
    }

    let args = vec!["-f".to_string(), SBY_FILE.to_string()];
    let output = run_tool_captured(ToolKind::Formal.program(), &args, work_dir, timeout).await;
    FormalOutput {
        available: true,
        passed: Some(output.success()),
        output,
    }
}
