//! Circuit diagram adapter (Yosys `show`)

use crate::runner::{relative_to, run_tool_captured, write_input};
use crate::{ToolKind, ToolOutput, EXIT_IO};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SHOW_SCRIPT: &str = "yosys_show.ys";

/// File names `show -prefix circuit` may produce, in preference order
const DIAGRAM_CANDIDATES: [&str; 3] = ["circuit.svg", "circuit_0.svg", "show.svg"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualizeOutput {
    pub output: ToolOutput,
    pub diagram: Option<PathBuf>,
}

pub fn show_script(dut_name: &str, top: &str) -> String {
    format!(
        "read_verilog -sv {}\nsynth -top {}\nshow -format svg -prefix circuit\n",
        dut_name, top
    )
}

/// First diagram file present in `work_dir`
pub fn find_diagram(work_dir: &Path) -> Option<PathBuf> {
    DIAGRAM_CANDIDATES
        .iter()
        .map(|name| work_dir.join(name))
        .find(|path| path.is_file())
}

/// Remove diagrams a previous run left in `work_dir`
pub async fn clear_diagrams(work_dir: &Path) -> std::io::Result<()> {
    for name in DIAGRAM_CANDIDATES {
        match tokio::fs::remove_file(work_dir.join(name)).await {
            Ok(()) => log::debug!("removed stale diagram {}", name),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Render the synthesized netlist as an SVG diagram
pub async fn run_visualize(
    dut: &Path,
    top: &str,
    work_dir: &Path,
    timeout: Duration,
) -> VisualizeOutput {
    let dut_name = relative_to(dut, work_dir).to_string_lossy().to_string();
    let script_path = work_dir.join(SHOW_SCRIPT);
    if let Err(output) = write_input(&script_path, &show_script(&dut_name, top)).await {
        return VisualizeOutput {
            output,
            diagram: None,
        };
    }

    if let Err(e) = clear_diagrams(work_dir).await {
        return VisualizeOutput {
            output: ToolOutput::new(EXIT_IO, "", format!("could not clear old diagrams: {}", e)),
            diagram: None,
        };
    }

    let args = vec!["-q".to_string(), "-s".to_string(), SHOW_SCRIPT.to_string()];
    let output = run_tool_captured(ToolKind::Visualize.program(), &args, work_dir, timeout).await;
    let diagram = if output.success() {
        find_diagram(work_dir)
    } else {
        None
    };
    VisualizeOutput { output, diagram }
}
