//! The tool roles as one capability
//!
//! The control loop only talks to a [`Toolchain`]; [`ExternalToolchain`] is
//! the implementation that shells out to the installed programs.

use crate::formal::{run_formal, FormalOutput, DEFAULT_DEPTH};
use crate::probe::ToolAvailability;
use crate::simulator::CompileOutput;
use crate::visualizer::VisualizeOutput;
use crate::{lint, simulator, synthesis, visualizer, ToolOutput, ToolTimeouts};
use async_trait::async_trait;
use std::path::Path;

/// Uniform access to lint, compile, simulate, synthesize, visualize and
/// formal-check
///
/// Source files are already written to `work_dir` by the caller; each call
/// blocks the caller until the tool exits or its time budget runs out.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Which roles can run in this environment
    fn probe(&self) -> ToolAvailability;

    async fn lint(&self, dut: &Path, top: &str, work_dir: &Path) -> ToolOutput;

    async fn compile(&self, dut: &Path, testbench: &Path, work_dir: &Path) -> CompileOutput;

    async fn simulate(&self, binary: &Path, work_dir: &Path) -> ToolOutput;

    async fn synthesize(&self, dut: &Path, top: &str, work_dir: &Path) -> ToolOutput;

    async fn visualize(&self, dut: &Path, top: &str, work_dir: &Path) -> VisualizeOutput;

    async fn formal_check(
        &self,
        dut: &Path,
        top: &str,
        work_dir: &Path,
        availability: &ToolAvailability,
    ) -> FormalOutput;
}

/// Toolchain backed by the programs found on `PATH`
#[derive(Debug, Clone)]
pub struct ExternalToolchain {
    timeouts: ToolTimeouts,
    formal_depth: u32,
}

impl Default for ExternalToolchain {
    fn default() -> Self {
        Self::new(ToolTimeouts::default())
    }
}

impl ExternalToolchain {
    pub fn new(timeouts: ToolTimeouts) -> Self {
        Self {
            timeouts,
            formal_depth: DEFAULT_DEPTH,
        }
    }

    pub fn with_formal_depth(mut self, depth: u32) -> Self {
        self.formal_depth = depth;
        self
    }

    pub fn timeouts(&self) -> &ToolTimeouts {
        &self.timeouts
    }
}

#[async_trait]
impl Toolchain for ExternalToolchain {
    fn probe(&self) -> ToolAvailability {
        ToolAvailability::probe()
    }

    async fn lint(&self, dut: &Path, top: &str, work_dir: &Path) -> ToolOutput {
        lint::run_lint(dut, top, work_dir, self.timeouts.lint).await
    }

    async fn compile(&self, dut: &Path, testbench: &Path, work_dir: &Path) -> CompileOutput {
        simulator::compile(dut, testbench, work_dir, self.timeouts.compile).await
    }

    async fn simulate(&self, binary: &Path, work_dir: &Path) -> ToolOutput {
        simulator::simulate(binary, work_dir, self.timeouts.simulate).await
    }

    async fn synthesize(&self, dut: &Path, top: &str, work_dir: &Path) -> ToolOutput {
        synthesis::run_synthesis(dut, top, work_dir, self.timeouts.synthesize).await
    }

    async fn visualize(&self, dut: &Path, top: &str, work_dir: &Path) -> VisualizeOutput {
        visualizer::run_visualize(dut, top, work_dir, self.timeouts.visualize).await
    }

    async fn formal_check(
        &self,
        dut: &Path,
        top: &str,
        work_dir: &Path,
        availability: &ToolAvailability,
    ) -> FormalOutput {
        run_formal(
            dut,
            top,
            work_dir,
            self.formal_depth,
            availability,
            self.timeouts.formal,
        )
        .await
    }
}
