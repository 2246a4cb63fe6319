//! Verilator lint adapter

use crate::runner::{relative_to, run_tool_captured};
use crate::{ToolKind, ToolOutput};
use std::path::Path;
use std::time::Duration;

/// Arguments for a lint-only Verilator run
pub fn lint_args(dut: &Path, top: &str, work_dir: &Path) -> Vec<String> {
    vec![
        "--lint-only".to_string(),
        "-Wall".to_string(),
        "-Wno-fatal".to_string(),
        "--top-module".to_string(),
        top.to_string(),
        relative_to(dut, work_dir).to_string_lossy().to_string(),
    ]
}

/// Static check of the design source, no code generation
pub async fn run_lint(dut: &Path, top: &str, work_dir: &Path, timeout: Duration) -> ToolOutput {
    let args = lint_args(dut, top, work_dir);
    run_tool_captured(ToolKind::Lint.program(), &args, work_dir, timeout).await
}
