//! Run report and persisted artifacts

use crate::error::{PipelineError, Result};
use crate::state::{AttemptStatus, PipelineState, RunStatus};
use rtlloop_spec::{ActionCategory, OracleVerdict};
use rtlloop_tools::SynthMetrics;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const FINAL_DUT: &str = "final_dut.sv";
pub const FINAL_TB: &str = "final_tb.sv";
pub const REPORT_FILE: &str = "report.json";
pub const METRICS_FILE: &str = "metrics.json";

/// Per-attempt line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub attempt: u32,
    pub status: AttemptStatus,
    pub action_type: ActionCategory,
    pub lint_rc: Option<i32>,
    pub compile_rc: i32,
    pub sim_rc: Option<i32>,
    pub oracle_verdict: Option<OracleVerdict>,
}

/// Condensed, serializable view of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub module_name: String,
    pub final_status: RunStatus,
    pub total_iterations: u32,
    pub max_retries: u32,
    pub best_attempt: Option<u32>,
    pub metrics: Option<SynthMetrics>,
    pub diagram: Option<PathBuf>,
    pub spec_derived_tb: bool,
    pub history: Vec<AttemptSummary>,
}

impl RunReport {
    pub fn new(module_name: &str, state: &PipelineState, max_retries: u32) -> Self {
        let history = state
            .history()
            .iter()
            .map(|r| AttemptSummary {
                attempt: r.attempt,
                status: r.status,
                action_type: r.action_type,
                lint_rc: r.lint_result.as_ref().map(|o| o.returncode),
                compile_rc: r.compile_result.returncode,
                sim_rc: r.run_result.as_ref().map(|o| o.returncode),
                oracle_verdict: r.oracle_verdict,
            })
            .collect();

        Self {
            module_name: module_name.to_string(),
            final_status: state.status(),
            total_iterations: state.iteration(),
            max_retries,
            best_attempt: state.best_candidate().map(|b| b.attempt),
            metrics: state.metrics().cloned(),
            diagram: state.diagram().map(Path::to_path_buf),
            spec_derived_tb: state.oracle_used(),
            history,
        }
    }
}

/// Paths written by [`persist_artifacts`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedArtifacts {
    pub final_dut: Option<PathBuf>,
    pub final_tb: Option<PathBuf>,
    pub report: PathBuf,
    pub metrics: Option<PathBuf>,
}

/// Write the best candidate, the report and the metrics under `work_dir`
///
/// The testbench written is the one the candidate was verified with. Final
/// sources or metrics left by an earlier run in the same directory are
/// removed when this run has none to write.
pub async fn persist_artifacts(
    report: &RunReport,
    state: &PipelineState,
    work_dir: &Path,
) -> Result<PersistedArtifacts> {
    let mut written = PersistedArtifacts {
        report: work_dir.join(REPORT_FILE),
        ..Default::default()
    };

    if let Some(best) = state.best_candidate() {
        let dut = work_dir.join(FINAL_DUT);
        let tb = work_dir.join(FINAL_TB);
        write(&dut, &best.rtl_code).await?;
        write(&tb, &best.verified_testbench).await?;
        written.final_dut = Some(dut);
        written.final_tb = Some(tb);
    } else {
        remove_stale(&work_dir.join(FINAL_DUT)).await?;
        remove_stale(&work_dir.join(FINAL_TB)).await?;
    }

    write(&written.report, &serde_json::to_string_pretty(report)?).await?;

    if let Some(metrics) = state.metrics() {
        let path = work_dir.join(METRICS_FILE);
        write(&path, &serde_json::to_string_pretty(metrics)?).await?;
        written.metrics = Some(path);
    } else {
        remove_stale(&work_dir.join(METRICS_FILE)).await?;
    }

    Ok(written)
}

async fn write(path: &Path, contents: &str) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| PipelineError::io(path, e))
}

async fn remove_stale(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            log::debug!("removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PipelineError::io(path, e)),
    }
}
