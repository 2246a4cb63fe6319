//! Yosys synthesis adapter

use crate::runner::{relative_to, run_tool_captured, write_input};
use crate::{ToolKind, ToolOutput};
use std::path::Path;
use std::time::Duration;

pub const SYNTH_SCRIPT: &str = "yosys_script.ys";

/// Yosys script: generic synthesis followed by a CMOS-cost `stat` report
pub fn synthesis_script(dut_name: &str, top: &str) -> String {
    format!(
        "read_verilog -sv {}\nsynth -top {}\nstat -tech cmos\n",
        dut_name, top
    )
}

/// Synthesize the design; `stdout` carries the `stat` report
pub async fn run_synthesis(dut: &Path, top: &str, work_dir: &Path, timeout: Duration) -> ToolOutput {
    let dut_name = relative_to(dut, work_dir).to_string_lossy().to_string();
    let script_path = work_dir.join(SYNTH_SCRIPT);
    if let Err(failed) = write_input(&script_path, &synthesis_script(&dut_name, top)).await {
        return failed;
    }

    let args = vec!["-s".to_string(), SYNTH_SCRIPT.to_string()];
    run_tool_captured(ToolKind::Synthesize.program(), &args, work_dir, timeout).await
}
