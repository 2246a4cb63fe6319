//! Pipeline state and attempt history

use chrono::{DateTime, Utc};
use rtlloop_spec::{ActionCategory, OracleVerdict};
use rtlloop_tools::{SynthMetrics, ToolOutput};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Init,
    Pass,
    Fail,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStatus::Init => "INIT",
            RunStatus::Pass => "PASS",
            RunStatus::Fail => "FAIL",
        })
    }
}

/// Outcome of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttemptStatus {
    Pass,
    Fail,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttemptStatus::Pass => "PASS",
            AttemptStatus::Fail => "FAIL",
        })
    }
}

/// One generate/repair + verify cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based
    pub attempt: u32,
    pub status: AttemptStatus,
    /// Classification of this attempt's outcome; drives the next repair
    pub action_type: ActionCategory,
    /// Present only when the lint tool ran
    pub lint_result: Option<ToolOutput>,
    pub compile_result: ToolOutput,
    /// Present only when compilation succeeded
    pub run_result: Option<ToolOutput>,
    /// Read from simulation output when the deterministic oracle was active
    pub oracle_verdict: Option<OracleVerdict>,
    pub module_name: String,
    pub rtl_code: String,
    /// Testbench returned by the collaborator
    pub testbench_code: String,
    /// Testbench actually compiled (the oracle when one exists)
    pub verified_testbench: String,
    /// Writer explanation on the first attempt, reviewer change list after
    pub notes: String,
    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn passed(&self) -> bool {
        self.status == AttemptStatus::Pass
    }

    pub fn compiled(&self) -> bool {
        self.compile_result.success()
    }
}

/// State of one pipeline run
///
/// Owned by the controller for the duration of the run; read-only to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Attempt number of the best candidate
    best_candidate: Option<u32>,
    history: Vec<AttemptRecord>,
    iteration: u32,
    status: RunStatus,
    metrics: Option<SynthMetrics>,
    diagram: Option<PathBuf>,
    oracle_used: bool,
}

impl PipelineState {
    pub(crate) fn new(oracle_used: bool) -> Self {
        Self {
            best_candidate: None,
            history: Vec::new(),
            iteration: 0,
            status: RunStatus::Init,
            metrics: None,
            diagram: None,
            oracle_used,
        }
    }

    pub fn best_candidate(&self) -> Option<&AttemptRecord> {
        let attempt = self.best_candidate?;
        self.history.iter().find(|r| r.attempt == attempt)
    }

    pub fn history(&self) -> &[AttemptRecord] {
        &self.history
    }

    pub fn last_attempt(&self) -> Option<&AttemptRecord> {
        self.history.last()
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn metrics(&self) -> Option<&SynthMetrics> {
        self.metrics.as_ref()
    }

    pub fn diagram(&self) -> Option<&Path> {
        self.diagram.as_deref()
    }

    /// Whether the deterministic oracle testbench was used
    pub fn oracle_used(&self) -> bool {
        self.oracle_used
    }

    pub(crate) fn record(&mut self, record: AttemptRecord) {
        self.status = match record.status {
            AttemptStatus::Pass => RunStatus::Pass,
            AttemptStatus::Fail => RunStatus::Fail,
        };
        self.history.push(record);
        self.iteration = self.history.len() as u32;
    }

    /// The newest attempt passed
    pub(crate) fn finish_pass(&mut self) {
        self.status = RunStatus::Pass;
        self.best_candidate = self.history.last().map(|r| r.attempt);
    }

    /// Retries exhausted; keep the newest attempt that compiled
    pub(crate) fn finish_exhausted(&mut self) {
        self.status = RunStatus::Fail;
        self.best_candidate = self
            .history
            .iter()
            .rev()
            .find(|r| r.compiled())
            .map(|r| r.attempt);
    }

    /// A collaborator failed; nothing is kept
    pub(crate) fn finish_aborted(&mut self) {
        self.status = RunStatus::Fail;
        self.best_candidate = None;
    }

    pub(crate) fn set_metrics(&mut self, metrics: SynthMetrics) {
        self.metrics = Some(metrics);
    }

    pub(crate) fn set_diagram(&mut self, diagram: PathBuf) {
        self.diagram = Some(diagram);
    }
}
