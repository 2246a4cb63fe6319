//! The generate-verify-repair state machine
//!
//! One run: attempt 1 asks the [`Writer`] for a design, later attempts ask
//! the [`Reviewer`] to repair the previous one. Every attempt is linted
//! (when the linter is installed), compiled and, if it compiled, simulated
//! against the active testbench. The run stops at the first PASS or when the
//! retry budget is spent; a collaborator error stops it immediately.

use crate::classifier::{FailureClassifier, KeywordClassifier};
use crate::error::{PipelineError, Result};
use crate::state::{AttemptRecord, AttemptStatus, PipelineState, RunStatus};
use chrono::Utc;
use rtlloop_agents::{GeneratedDesign, RepairRequest, RepairedDesign, Reviewer, Writer};
use rtlloop_spec::{build_oracle, OracleVerdict, SpecRecord};
use rtlloop_tools::{SynthMetrics, ToolAvailability, ToolKind, ToolOutput, Toolchain};
use std::path::Path;
use std::sync::Arc;

/// Default retry budget
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Longest diagnostic excerpt written to the log
const LOG_EXCERPT: usize = 400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum number of attempts, at least 1
    pub max_retries: u32,
    /// Synthesize and visualize after a PASS
    pub run_post_pass: bool,
    /// Lint each attempt when the linter is installed
    pub use_lint: bool,
    /// Require the oracle's PASS line, not just a zero exit status
    pub check_oracle_verdict: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            run_post_pass: true,
            use_lint: true,
            check_oracle_verdict: true,
        }
    }
}

/// Artifacts of the attempt in progress
struct Candidate {
    module_name: String,
    rtl_code: String,
    testbench_code: String,
    notes: String,
}

impl From<GeneratedDesign> for Candidate {
    fn from(design: GeneratedDesign) -> Self {
        Self {
            module_name: design.module_name,
            rtl_code: design.rtl_code,
            testbench_code: design.testbench_code,
            notes: design.explanation,
        }
    }
}

impl Candidate {
    fn repaired(design: RepairedDesign, previous_name: &str) -> Self {
        Self {
            module_name: design
                .module_name
                .unwrap_or_else(|| previous_name.to_string()),
            rtl_code: design.rtl_code,
            testbench_code: design.testbench_code,
            notes: design.changes_made,
        }
    }
}

/// Tool outputs of one verification pass
struct Verification {
    lint: Option<ToolOutput>,
    compile: ToolOutput,
    run: Option<ToolOutput>,
    verdict: Option<OracleVerdict>,
}

/// File stem for a module name coming back from a model
fn file_stem(module_name: &str) -> String {
    let stem: String = module_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "design".to_string()
    } else {
        stem
    }
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(LOG_EXCERPT) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub struct Pipeline {
    writer: Arc<dyn Writer>,
    reviewer: Arc<dyn Reviewer>,
    toolchain: Arc<dyn Toolchain>,
    classifier: Arc<dyn FailureClassifier>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        writer: Arc<dyn Writer>,
        reviewer: Arc<dyn Reviewer>,
        toolchain: Arc<dyn Toolchain>,
    ) -> Self {
        Self {
            writer,
            reviewer,
            toolchain,
            classifier: Arc::new(KeywordClassifier),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the loop for `spec` inside `work_dir`
    ///
    /// `work_dir` must not be shared with a concurrent run.
    pub async fn run(&self, spec: &SpecRecord, work_dir: &Path) -> Result<PipelineState> {
        tokio::fs::create_dir_all(work_dir)
            .await
            .map_err(|e| PipelineError::io(work_dir, e))?;

        let budget = if self.config.max_retries == 0 {
            log::warn!("retry budget of 0 raised to 1");
            1
        } else {
            self.config.max_retries
        };

        let availability = self.toolchain.probe();
        let use_lint = self.config.use_lint && availability.is_available(ToolKind::Lint);
        if self.config.use_lint && !use_lint {
            log::info!("verilator not found, skipping lint");
        }

        // Chosen once; every attempt is verified against the same testbench
        let oracle = build_oracle(spec);
        let mut state = PipelineState::new(oracle.is_some());

        log::info!("pipeline start: {} (budget {})", spec.module_name, budget);
        match &oracle {
            Some(o) => log::info!("using spec-derived testbench ({:?})", o.kind),
            None => log::info!("using collaborator testbench"),
        }

        for attempt in 1..=budget {
            log::info!("--- attempt {} / {} ---", attempt, budget);

            let candidate = match self.next_candidate(spec, &state, attempt, budget).await {
                Ok(candidate) => candidate,
                Err(e) => {
                    log::error!("attempt {}: collaborator failed: {}", attempt, e);
                    state.finish_aborted();
                    break;
                }
            };
            log::info!("module: {}", candidate.module_name);
            if !candidate.notes.is_empty() {
                log::debug!("notes: {}", excerpt(&candidate.notes));
            }

            let active_tb = match &oracle {
                Some(o) => o.testbench.clone(),
                None => candidate.testbench_code.clone(),
            };

            let stem = file_stem(&candidate.module_name);
            let dut_path = work_dir.join(format!("{}.sv", stem));
            let tb_path = work_dir.join(format!("tb_{}.sv", stem));
            write_source(&dut_path, &candidate.rtl_code).await?;
            write_source(&tb_path, &active_tb).await?;

            let verification = self
                .verify(
                    &dut_path,
                    &tb_path,
                    &candidate.module_name,
                    work_dir,
                    use_lint,
                    oracle.is_some(),
                )
                .await;

            let passed = self.passed(&verification);
            let action = self.classifier.classify(
                verification.lint.as_ref(),
                &verification.compile,
                verification.run.as_ref(),
            );
            let status = if passed {
                AttemptStatus::Pass
            } else {
                AttemptStatus::Fail
            };
            log::info!("decision: {} (action: {})", status, action);

            state.record(AttemptRecord {
                attempt,
                status,
                action_type: action,
                lint_result: verification.lint,
                compile_result: verification.compile,
                run_result: verification.run,
                oracle_verdict: verification.verdict,
                module_name: candidate.module_name,
                rtl_code: candidate.rtl_code,
                testbench_code: candidate.testbench_code,
                verified_testbench: active_tb,
                notes: candidate.notes,
                timestamp: Utc::now(),
            });

            if passed {
                state.finish_pass();
                if self.config.run_post_pass {
                    self.post_pass(&mut state, &dut_path, work_dir, &availability)
                        .await;
                }
                break;
            }

            if attempt == budget {
                log::warn!("retry budget ({}) exhausted", budget);
                state.finish_exhausted();
            }
        }

        match state.best_candidate() {
            Some(best) => log::info!(
                "final: {} after {} attempt(s), best attempt {} ({})",
                state.status(),
                state.iteration(),
                best.attempt,
                best.status
            ),
            None => log::info!(
                "final: {} after {} attempt(s), no candidate",
                state.status(),
                state.iteration()
            ),
        }
        debug_assert!(state.status() != RunStatus::Init);
        Ok(state)
    }

    /// Ask the writer (first attempt) or the reviewer (later attempts)
    async fn next_candidate(
        &self,
        spec: &SpecRecord,
        state: &PipelineState,
        attempt: u32,
        budget: u32,
    ) -> rtlloop_agents::AgentResult<Candidate> {
        let Some(previous) = state.last_attempt() else {
            log::info!("writer: generating RTL and testbench");
            return self.writer.generate(spec).await.map(Candidate::from);
        };

        log::info!("reviewer: repairing ({})", previous.action_type);
        let request = RepairRequest {
            spec,
            rtl_code: &previous.rtl_code,
            testbench_code: &previous.testbench_code,
            compile_result: &previous.compile_result,
            run_result: previous.run_result.as_ref(),
            action: previous.action_type,
            attempt,
            max_retries: budget,
        };
        let repaired = self.reviewer.repair(&request).await?;
        Ok(Candidate::repaired(repaired, &previous.module_name))
    }

    async fn verify(
        &self,
        dut: &Path,
        testbench: &Path,
        top: &str,
        work_dir: &Path,
        use_lint: bool,
        oracle_active: bool,
    ) -> Verification {
        let lint = if use_lint {
            let out = self.toolchain.lint(dut, top, work_dir).await;
            if !out.success() {
                log::info!("lint rc {}: {}", out.returncode, excerpt(&out.stderr));
            }
            Some(out)
        } else {
            None
        };

        let compiled = self.toolchain.compile(dut, testbench, work_dir).await;
        log::info!("compile rc {}", compiled.output.returncode);
        if !compiled.output.stderr.is_empty() {
            log::debug!("compile stderr: {}", excerpt(&compiled.output.stderr));
        }

        let run = if compiled.output.success() {
            let out = self.toolchain.simulate(&compiled.binary, work_dir).await;
            log::info!("simulate rc {}", out.returncode);
            log::debug!("simulate stdout: {}", excerpt(&out.stdout));
            Some(out)
        } else {
            None
        };

        let verdict = run
            .as_ref()
            .filter(|_| oracle_active)
            .map(|out| OracleVerdict::from_output(&out.stdout));
        if let Some(verdict) = verdict {
            log::info!("oracle verdict: {:?}", verdict);
        }

        Verification {
            lint,
            compile: compiled.output,
            run,
            verdict,
        }
    }

    /// Compile succeeded and simulation was clean or skipped
    fn passed(&self, v: &Verification) -> bool {
        if !v.compile.success() {
            return false;
        }
        let Some(run) = &v.run else {
            return true;
        };
        if !run.success() {
            return false;
        }
        match v.verdict {
            Some(verdict) if self.config.check_oracle_verdict => verdict == OracleVerdict::Pass,
            _ => true,
        }
    }

    /// Best-effort synthesis metrics and diagram
    async fn post_pass(
        &self,
        state: &mut PipelineState,
        dut: &Path,
        work_dir: &Path,
        availability: &ToolAvailability,
    ) {
        if !availability.is_available(ToolKind::Synthesize) {
            log::info!("yosys not found, skipping post-pass");
            return;
        }
        let Some(top) = state.best_candidate().map(|b| b.module_name.clone()) else {
            return;
        };

        let synth = self.toolchain.synthesize(dut, &top, work_dir).await;
        if synth.success() {
            let metrics = SynthMetrics::parse(&synth.stdout);
            if metrics.is_empty() {
                log::info!("synthesis report had no recognised metrics");
            } else {
                log::info!("metrics: {:?}", metrics);
                state.set_metrics(metrics);
            }
        } else {
            log::warn!("synthesis rc {}: {}", synth.returncode, excerpt(&synth.stderr));
        }

        let shown = self.toolchain.visualize(dut, &top, work_dir).await;
        match shown.diagram {
            Some(path) => {
                log::info!("diagram: {}", path.display());
                state.set_diagram(path);
            }
            None => log::info!("no diagram produced (rc {})", shown.output.returncode),
        }
    }
}

async fn write_source(path: &Path, contents: &str) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| PipelineError::io(path, e))
}
