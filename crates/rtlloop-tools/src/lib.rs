//! rtlloop verification tool adapters
//!
//! Thin async wrappers around the open-source HDL tools the repair loop
//! drives. Every adapter runs one external program in the run's working
//! directory, bounded by a timeout, and reports a uniform [`ToolOutput`].
//!
//! | Role       | Program                    |
//! |------------|----------------------------|
//! | lint       | `verilator --lint-only`    |
//! | compile    | `iverilog -g2012`          |
//! | simulate   | `vvp`                      |
//! | synthesize | `yosys` (`synth` + `stat`) |
//! | visualize  | `yosys` (`show`)           |
//! | formal     | `sby` (bounded model check)|
//!
//! Tool failures never surface as Rust errors to the caller of an adapter:
//! spawn failures and timeouts are folded into a failed [`ToolOutput`] whose
//! stderr describes what happened.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod formal;
pub mod lint;
pub mod metrics;
pub mod probe;
pub mod runner;
pub mod simulator;
pub mod synthesis;
pub mod toolchain;
pub mod visualizer;

pub use formal::FormalOutput;
pub use metrics::SynthMetrics;
pub use probe::ToolAvailability;
pub use simulator::CompileOutput;
pub use toolchain::{ExternalToolchain, Toolchain};
pub use visualizer::VisualizeOutput;

/// Exit status reported when the program could not be found
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit status reported when the program exceeded its time budget
pub const EXIT_TIMEOUT: i32 = 124;

/// Exit status reported for local I/O failures around a tool call
pub const EXIT_IO: i32 = 1;

/// Tool adapter errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),
    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tool operations
pub type ToolResult<T> = Result<T, ToolError>;

/// Captured result of one tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn new(returncode: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            returncode,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Failed output standing in for an adapter error
    pub fn from_error(err: &ToolError) -> Self {
        let returncode = match err {
            ToolError::NotFound(_) => EXIT_NOT_FOUND,
            ToolError::Timeout { .. } => EXIT_TIMEOUT,
            ToolError::Io(_) => EXIT_IO,
        };
        Self::new(returncode, "", err.to_string())
    }

    pub fn success(&self) -> bool {
        self.returncode == 0
    }
}

/// The external tool roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Lint,
    Compile,
    Simulate,
    Synthesize,
    Visualize,
    Formal,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::Lint,
        ToolKind::Compile,
        ToolKind::Simulate,
        ToolKind::Synthesize,
        ToolKind::Visualize,
        ToolKind::Formal,
    ];

    /// Executable backing this role
    pub fn program(&self) -> &'static str {
        match self {
            ToolKind::Lint => "verilator",
            ToolKind::Compile => "iverilog",
            ToolKind::Simulate => "vvp",
            ToolKind::Synthesize | ToolKind::Visualize => "yosys",
            ToolKind::Formal => "sby",
        }
    }

    /// Roles the loop can run without
    pub fn is_optional(&self) -> bool {
        matches!(self, ToolKind::Lint | ToolKind::Formal)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolKind::Lint => "lint",
            ToolKind::Compile => "compile",
            ToolKind::Simulate => "simulate",
            ToolKind::Synthesize => "synthesize",
            ToolKind::Visualize => "visualize",
            ToolKind::Formal => "formal",
        };
        f.write_str(name)
    }
}

/// Per-tool time budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolTimeouts {
    pub lint: Duration,
    pub compile: Duration,
    pub simulate: Duration,
    pub synthesize: Duration,
    pub visualize: Duration,
    pub formal: Duration,
}

impl Default for ToolTimeouts {
    fn default() -> Self {
        Self {
            lint: Duration::from_secs(30),
            compile: Duration::from_secs(60),
            simulate: Duration::from_secs(60),
            synthesize: Duration::from_secs(60),
            visualize: Duration::from_secs(60),
            formal: Duration::from_secs(60),
        }
    }
}

impl ToolTimeouts {
    pub fn for_kind(&self, kind: ToolKind) -> Duration {
        match kind {
            ToolKind::Lint => self.lint,
            ToolKind::Compile => self.compile,
            ToolKind::Simulate => self.simulate,
            ToolKind::Synthesize => self.synthesize,
            ToolKind::Visualize => self.visualize,
            ToolKind::Formal => self.formal,
        }
    }
}
