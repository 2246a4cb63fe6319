//! Icarus Verilog compile and simulate adapters

use crate::runner::{relative_to, run_tool_captured};
use crate::{ToolKind, ToolOutput};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the compiled simulation image inside the working directory
pub const SIM_BINARY: &str = "sim.out";

/// Compile result plus the image a follow-up simulate step runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutput {
    pub output: ToolOutput,
    pub binary: PathBuf,
}

pub fn compile_args(dut: &Path, testbench: &Path, work_dir: &Path) -> Vec<String> {
    vec![
        "-g2012".to_string(),
        "-o".to_string(),
        SIM_BINARY.to_string(),
        relative_to(dut, work_dir).to_string_lossy().to_string(),
        relative_to(testbench, work_dir).to_string_lossy().to_string(),
    ]
}

/// Compile design and testbench into a simulation image
pub async fn compile(
    dut: &Path,
    testbench: &Path,
    work_dir: &Path,
    timeout: Duration,
) -> CompileOutput {
    let binary = work_dir.join(SIM_BINARY);
    // A failed compile must not leave the previous attempt's image behind
    if let Err(e) = tokio::fs::remove_file(&binary).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("could not remove stale {}: {}", binary.display(), e);
        }
    }

    let args = compile_args(dut, testbench, work_dir);
    let output = run_tool_captured(ToolKind::Compile.program(), &args, work_dir, timeout).await;
    CompileOutput { output, binary }
}

/// Run a compiled simulation image
pub async fn simulate(binary: &Path, work_dir: &Path, timeout: Duration) -> ToolOutput {
    let args = vec![relative_to(binary, work_dir).to_string_lossy().to_string()];
    run_tool_captured(ToolKind::Simulate.program(), &args, work_dir, timeout).await
}
