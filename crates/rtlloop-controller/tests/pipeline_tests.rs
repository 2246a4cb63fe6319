//! End-to-end runs of the control loop with scripted collaborators and tools

use async_trait::async_trait;
use rtlloop_agents::{
    AgentError, AgentResult, GeneratedDesign, RepairRequest, RepairedDesign, Reviewer, Writer,
};
use rtlloop_controller::{
    persist_artifacts, run_benchmark, AttemptStatus, Pipeline, PipelineConfig, PipelineState,
    RunReport, RunStatus,
};
use rtlloop_spec::{build_oracle, ActionCategory, OracleVerdict, SpecRecord};
use rtlloop_tools::{
    CompileOutput, FormalOutput, ToolAvailability, ToolKind, ToolOutput, Toolchain,
    VisualizeOutput,
};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const XOR_SPEC: &str = r#"{
    "module_name": "xor2",
    "description": "two-input exclusive or",
    "inputs": [{"name": "a", "width": 1}, {"name": "b", "width": 1}],
    "outputs": [{"name": "y", "width": 1}],
    "truth_table": [[[0,0],0],[[0,1],1],[[1,0],1],[[1,1],0]]
}"#;

const COUNTER_SPEC: &str = r#"{
    "module_name": "counter",
    "description": "4-bit up counter",
    "inputs": [{"name": "clk", "width": 1}, {"name": "rst", "width": 1}],
    "outputs": [{"name": "q", "width": 4}],
    "clock": "clk",
    "reset": "rst"
}"#;

const XOR_RTL: &str = "module xor2(input a, input b, output y);\n  assign y = a ^ b;\nendmodule\n";
const OR_RTL: &str = "module xor2(input a, input b, output y);\n  assign y = a | b;\nendmodule\n";

const STAT: &str = "   Number of wires:   3\n   Number of cells:   1\n   Chip area for module '\\xor2': 12.5\n";

fn spec(json: &str) -> SpecRecord {
    SpecRecord::from_json(json).unwrap()
}

fn design(module: &str, rtl: &str, tb: &str) -> GeneratedDesign {
    GeneratedDesign {
        module_name: module.to_string(),
        rtl_code: rtl.to_string(),
        testbench_code: tb.to_string(),
        explanation: "scripted".to_string(),
    }
}

fn repair(module: Option<&str>, rtl: &str, tb: &str) -> AgentResult<RepairedDesign> {
    Ok(RepairedDesign {
        module_name: module.map(str::to_string),
        rtl_code: rtl.to_string(),
        testbench_code: tb.to_string(),
        changes_made: "scripted repair".to_string(),
    })
}

// --- scripted collaborators -------------------------------------------------

struct ScriptedWriter {
    reply: Option<GeneratedDesign>,
}

#[async_trait]
impl Writer for ScriptedWriter {
    async fn generate(&self, _spec: &SpecRecord) -> AgentResult<GeneratedDesign> {
        self.reply
            .clone()
            .ok_or_else(|| AgentError::MalformedResponse("expected value".to_string()))
    }
}

/// What the reviewer was asked, per call
#[derive(Debug, Clone, PartialEq)]
struct SeenRequest {
    attempt: u32,
    action: ActionCategory,
    rtl_code: String,
    simulated: bool,
}

#[derive(Default)]
struct ScriptedReviewer {
    replies: Mutex<VecDeque<AgentResult<RepairedDesign>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedReviewer {
    fn new(replies: Vec<AgentResult<RepairedDesign>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reviewer for ScriptedReviewer {
    async fn repair(&self, request: &RepairRequest<'_>) -> AgentResult<RepairedDesign> {
        self.seen.lock().unwrap().push(SeenRequest {
            attempt: request.attempt,
            action: request.action,
            rtl_code: request.rtl_code.to_string(),
            simulated: request.run_result.is_some(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::MalformedResponse("no more replies".into())))
    }
}

type Rule = Box<dyn Fn(&str) -> ToolOutput + Send + Sync>;

/// Tools whose verdicts are computed from the RTL text
struct ScriptedTools {
    availability: ToolAvailability,
    lint: Rule,
    compile: Rule,
    simulate: Rule,
    synthesize: ToolOutput,
    diagram: bool,
    current_rtl: Mutex<String>,
    compiled_testbenches: Mutex<Vec<String>>,
}

impl ScriptedTools {
    fn new(compile: Rule, simulate: Rule) -> Self {
        Self {
            availability: ToolAvailability::with(&[ToolKind::Compile, ToolKind::Simulate]),
            lint: Box::new(|_| ToolOutput::new(0, "", "")),
            compile,
            simulate,
            synthesize: ToolOutput::new(0, STAT, ""),
            diagram: true,
            current_rtl: Mutex::new(String::new()),
            compiled_testbenches: Mutex::new(Vec::new()),
        }
    }

    fn available(mut self, kinds: &[ToolKind]) -> Self {
        self.availability = ToolAvailability::with(kinds);
        self
    }

    fn compiled_testbenches(&self) -> Vec<String> {
        self.compiled_testbenches.lock().unwrap().clone()
    }
}

fn ok() -> ToolOutput {
    ToolOutput::new(0, "", "")
}

/// Simulation of the xor oracle: passes only for an xor implementation
fn xor_simulation(rtl: &str) -> ToolOutput {
    if rtl.contains('^') {
        ToolOutput::new(0, "in=00 out=0 exp=0\nPASS", "")
    } else {
        ToolOutput::new(1, "MISMATCH row 3\nFAIL: 1 mismatches", "")
    }
}

#[async_trait]
impl Toolchain for ScriptedTools {
    fn probe(&self) -> ToolAvailability {
        self.availability.clone()
    }

    async fn lint(&self, dut: &Path, _top: &str, _work_dir: &Path) -> ToolOutput {
        let rtl = std::fs::read_to_string(dut).unwrap();
        (self.lint)(&rtl)
    }

    async fn compile(&self, dut: &Path, testbench: &Path, work_dir: &Path) -> CompileOutput {
        let rtl = std::fs::read_to_string(dut).unwrap();
        let tb = std::fs::read_to_string(testbench).unwrap();
        self.compiled_testbenches.lock().unwrap().push(tb);
        *self.current_rtl.lock().unwrap() = rtl.clone();
        CompileOutput {
            output: (self.compile)(&rtl),
            binary: work_dir.join("sim.out"),
        }
    }

    async fn simulate(&self, _binary: &Path, _work_dir: &Path) -> ToolOutput {
        let rtl = self.current_rtl.lock().unwrap().clone();
        (self.simulate)(&rtl)
    }

    async fn synthesize(&self, _dut: &Path, _top: &str, _work_dir: &Path) -> ToolOutput {
        self.synthesize.clone()
    }

    async fn visualize(&self, _dut: &Path, _top: &str, work_dir: &Path) -> VisualizeOutput {
        VisualizeOutput {
            output: ok(),
            diagram: self.diagram.then(|| work_dir.join("circuit.svg")),
        }
    }

    async fn formal_check(
        &self,
        _dut: &Path,
        _top: &str,
        _work_dir: &Path,
        _availability: &ToolAvailability,
    ) -> FormalOutput {
        FormalOutput::unavailable()
    }
}

/// Writer that panics for one module name
struct PanickingWriter {
    module: &'static str,
}

#[async_trait]
impl Writer for PanickingWriter {
    async fn generate(&self, spec: &SpecRecord) -> AgentResult<GeneratedDesign> {
        if spec.module_name == self.module {
            panic!("writer crashed on {}", spec.module_name);
        }
        Ok(design("xor2", XOR_RTL, "// tb"))
    }
}

fn pipeline(
    writer: Option<GeneratedDesign>,
    reviewer: Arc<ScriptedReviewer>,
    tools: Arc<ScriptedTools>,
) -> Pipeline {
    Pipeline::new(Arc::new(ScriptedWriter { reply: writer }), reviewer, tools)
}

/// Properties every finished run must satisfy
fn assert_run_invariants(state: &PipelineState) {
    assert_ne!(state.status(), RunStatus::Init);
    assert_eq!(state.iteration() as usize, state.history().len());
    for (i, record) in state.history().iter().enumerate() {
        assert_eq!(record.attempt as usize, i + 1);
        if record.run_result.is_some() {
            assert!(record.compile_result.success());
        }
        if record.status == AttemptStatus::Pass {
            assert!(record.compile_result.success());
            assert!(record.run_result.as_ref().map_or(true, ToolOutput::success));
        }
    }
}

// --- scenarios --------------------------------------------------------------

#[tokio::test]
async fn test_truth_table_pass_on_first_attempt() {
    let dir = TempDir::new().unwrap();
    let spec = spec(XOR_SPEC);
    let tools = Arc::new(ScriptedTools::new(Box::new(|_| ok()), Box::new(xor_simulation)));
    let reviewer = ScriptedReviewer::new(vec![]);

    let state = pipeline(Some(design("xor2", XOR_RTL, "// llm tb")), reviewer.clone(), tools.clone())
        .run(&spec, dir.path())
        .await
        .unwrap();

    assert_run_invariants(&state);
    assert_eq!(state.status(), RunStatus::Pass);
    assert_eq!(state.iteration(), 1);
    assert_eq!(state.best_candidate().unwrap().attempt, 1);
    assert!(state.oracle_used());
    assert!(reviewer.seen().is_empty());

    let record = &state.history()[0];
    assert!(record.lint_result.is_none());
    assert_eq!(record.oracle_verdict, Some(OracleVerdict::Pass));
    assert_eq!(record.testbench_code, "// llm tb");
    assert_eq!(
        record.verified_testbench,
        build_oracle(&spec).unwrap().testbench
    );
    assert!(dir.path().join("xor2.sv").exists());
    assert!(dir.path().join("tb_xor2.sv").exists());

    // yosys reported missing, so no post-pass
    assert!(state.metrics().is_none());
    assert!(state.diagram().is_none());
}

#[tokio::test]
async fn test_malformed_generation_aborts_immediately() {
    let dir = TempDir::new().unwrap();
    let tools = Arc::new(ScriptedTools::new(Box::new(|_| ok()), Box::new(|_| ok())));
    let reviewer = ScriptedReviewer::new(vec![]);

    let state = pipeline(None, reviewer.clone(), tools.clone())
        .run(&spec(XOR_SPEC), dir.path())
        .await
        .unwrap();

    assert_run_invariants(&state);
    assert_eq!(state.status(), RunStatus::Fail);
    assert!(state.history().is_empty());
    assert_eq!(state.iteration(), 0);
    assert!(state.best_candidate().is_none());
    assert!(reviewer.seen().is_empty());
    assert!(tools.compiled_testbenches().is_empty());
}

#[tokio::test]
async fn test_retry_exhaustion_on_syntax_errors() {
    let dir = TempDir::new().unwrap();
    let tools = Arc::new(ScriptedTools::new(
        Box::new(|_| ToolOutput::new(1, "", "counter.sv:2: syntax error")),
        Box::new(|_| ok()),
    ));
    let reviewer = ScriptedReviewer::new(vec![
        repair(None, "module counter(); // v2", "// tb v2"),
        repair(None, "module counter(); // v3", "// tb v3"),
    ]);

    let state = pipeline(
        Some(design("counter", "module counter(); // v1", "// tb v1")),
        reviewer.clone(),
        tools,
    )
    .with_config(PipelineConfig {
        max_retries: 3,
        ..Default::default()
    })
    .run(&spec(COUNTER_SPEC), dir.path())
    .await
    .unwrap();

    assert_run_invariants(&state);
    assert_eq!(state.status(), RunStatus::Fail);
    assert_eq!(state.iteration(), 3);
    assert!(state.best_candidate().is_none());
    for record in state.history() {
        assert_eq!(record.action_type, ActionCategory::FixParse);
        assert_eq!(record.status, AttemptStatus::Fail);
        assert!(record.run_result.is_none());
    }

    let seen = reviewer.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!((seen[0].attempt, seen[1].attempt), (2, 3));
    assert!(seen.iter().all(|s| s.action == ActionCategory::FixParse && !s.simulated));
    // Each repair sees the previous attempt's RTL
    assert!(seen[0].rtl_code.ends_with("// v1"));
    assert!(seen[1].rtl_code.ends_with("// v2"));
    // Reviewer omitted the module name; the previous one is kept
    assert!(state.history().iter().all(|r| r.module_name == "counter"));
}

#[tokio::test]
async fn test_best_candidate_is_newest_compiled_attempt() {
    let dir = TempDir::new().unwrap();
    let tools = Arc::new(ScriptedTools::new(
        Box::new(|rtl| {
            if rtl.contains("v3") {
                ok()
            } else {
                ToolOutput::new(2, "", "port q not found")
            }
        }),
        Box::new(|_| ToolOutput::new(1, "assertion failed", "")),
    ));
    let reviewer = ScriptedReviewer::new(vec![
        repair(Some("counter"), "module counter(); // v2", "// tb"),
        repair(Some("counter"), "module counter(); // v3", "// tb"),
    ]);

    let state = pipeline(
        Some(design("counter", "module counter(); // v1", "// tb")),
        reviewer.clone(),
        tools,
    )
    .run(&spec(COUNTER_SPEC), dir.path())
    .await
    .unwrap();

    assert_run_invariants(&state);
    assert_eq!(state.status(), RunStatus::Fail);
    let best = state.best_candidate().unwrap();
    assert_eq!(best.attempt, 3);
    assert!(best.rtl_code.contains("v3"));

    let actions: Vec<ActionCategory> = state.history().iter().map(|r| r.action_type).collect();
    assert_eq!(
        actions,
        vec![
            ActionCategory::FixPorts,
            ActionCategory::FixPorts,
            ActionCategory::FixFunction
        ]
    );
    assert!(state.history()[2].run_result.is_some());
    assert!(state.history()[2].oracle_verdict.is_none());
}

#[tokio::test]
async fn test_oracle_is_stable_across_attempts() {
    let dir = TempDir::new().unwrap();
    let spec = spec(XOR_SPEC);
    let tools = Arc::new(ScriptedTools::new(Box::new(|_| ok()), Box::new(xor_simulation)));
    let reviewer = ScriptedReviewer::new(vec![
        repair(None, &OR_RTL.replace('|', "&"), "// tb from repair 1"),
        repair(None, XOR_RTL, "// tb from repair 2"),
    ]);

    let state = pipeline(Some(design("xor2", OR_RTL, "// tb from writer")), reviewer.clone(), tools.clone())
        .run(&spec, dir.path())
        .await
        .unwrap();

    assert_run_invariants(&state);
    assert_eq!(state.status(), RunStatus::Pass);
    assert_eq!(state.iteration(), 3);
    assert_eq!(state.best_candidate().unwrap().attempt, 3);

    let oracle = build_oracle(&spec).unwrap().testbench;
    let compiled = tools.compiled_testbenches();
    assert_eq!(compiled.len(), 3);
    assert!(compiled.iter().all(|tb| *tb == oracle));

    let seen = reviewer.seen();
    assert!(seen.iter().all(|s| s.action == ActionCategory::FixFunction && s.simulated));
    // RTL changed between attempts while the testbench did not
    assert_ne!(state.history()[0].rtl_code, state.history()[1].rtl_code);
}

#[tokio::test]
async fn test_oracle_failure_line_fails_clean_exit() {
    let simulate = || -> Rule { Box::new(|_| ToolOutput::new(0, "MISMATCH row 1\nFAIL: 1 mismatches", "")) };

    let dir = TempDir::new().unwrap();
    let tools = Arc::new(ScriptedTools::new(Box::new(|_| ok()), simulate()));
    let state = pipeline(
        Some(design("xor2", OR_RTL, "// tb")),
        ScriptedReviewer::new(vec![]),
        tools,
    )
    .with_config(PipelineConfig {
        max_retries: 1,
        ..Default::default()
    })
    .run(&spec(XOR_SPEC), dir.path())
    .await
    .unwrap();

    assert_run_invariants(&state);
    assert_eq!(state.status(), RunStatus::Fail);
    let record = &state.history()[0];
    assert_eq!(record.oracle_verdict, Some(OracleVerdict::Fail));
    assert_eq!(record.action_type, ActionCategory::FixFunction);
    // Compiled, so it is still the best candidate
    assert_eq!(state.best_candidate().unwrap().attempt, 1);

    // Exit status alone decides when verdict checking is off
    let dir = TempDir::new().unwrap();
    let tools = Arc::new(ScriptedTools::new(Box::new(|_| ok()), simulate()));
    let state = pipeline(
        Some(design("xor2", OR_RTL, "// tb")),
        ScriptedReviewer::new(vec![]),
        tools,
    )
    .with_config(PipelineConfig {
        max_retries: 1,
        check_oracle_verdict: false,
        run_post_pass: false,
        ..Default::default()
    })
    .run(&spec(XOR_SPEC), dir.path())
    .await
    .unwrap();
    assert_eq!(state.status(), RunStatus::Pass);
}

#[tokio::test]
async fn test_reviewer_error_aborts_run() {
    let dir = TempDir::new().unwrap();
    let tools = Arc::new(ScriptedTools::new(
        Box::new(|_| ToolOutput::new(1, "", "syntax error")),
        Box::new(|_| ok()),
    ));
    let reviewer = ScriptedReviewer::new(vec![Err(AgentError::MalformedResponse(
        "not json".to_string(),
    ))]);

    let state = pipeline(Some(design("counter", "module", "// tb")), reviewer, tools)
        .run(&spec(COUNTER_SPEC), dir.path())
        .await
        .unwrap();

    assert_run_invariants(&state);
    assert_eq!(state.status(), RunStatus::Fail);
    assert_eq!(state.iteration(), 1);
    assert!(state.best_candidate().is_none());
}

#[tokio::test]
async fn test_lint_diagnostics_take_priority() {
    let dir = TempDir::new().unwrap();
    let mut tools = ScriptedTools::new(
        Box::new(|_| ToolOutput::new(1, "", "syntax error")),
        Box::new(|_| ok()),
    )
    .available(&[ToolKind::Lint, ToolKind::Compile, ToolKind::Simulate]);
    tools.lint = Box::new(|_| ToolOutput::new(1, "", "%Error: Port 'q' width 4 vs 8"));
    let tools = Arc::new(tools);

    let state = pipeline(
        Some(design("counter", "module counter(); endmodule", "// tb")),
        ScriptedReviewer::new(vec![]),
        tools,
    )
    .with_config(PipelineConfig {
        max_retries: 1,
        ..Default::default()
    })
    .run(&spec(COUNTER_SPEC), dir.path())
    .await
    .unwrap();

    let record = &state.history()[0];
    assert!(record.lint_result.is_some());
    assert_eq!(record.action_type, ActionCategory::FixPorts);
}

#[tokio::test]
async fn test_lint_disabled_by_config() {
    let dir = TempDir::new().unwrap();
    let tools = Arc::new(
        ScriptedTools::new(Box::new(|_| ok()), Box::new(|_| ok()))
            .available(&[ToolKind::Lint, ToolKind::Compile, ToolKind::Simulate]),
    );

    let state = pipeline(
        Some(design("counter", "module counter(); endmodule", "// tb")),
        ScriptedReviewer::new(vec![]),
        tools,
    )
    .with_config(PipelineConfig {
        use_lint: false,
        ..Default::default()
    })
    .run(&spec(COUNTER_SPEC), dir.path())
    .await
    .unwrap();

    assert_eq!(state.status(), RunStatus::Pass);
    assert!(state.history()[0].lint_result.is_none());
    // No oracle for this spec, so exit status decides
    assert!(!state.oracle_used());
    assert!(state.history()[0].oracle_verdict.is_none());
}

#[tokio::test]
async fn test_post_pass_collects_metrics_and_diagram() {
    let dir = TempDir::new().unwrap();
    let tools = Arc::new(
        ScriptedTools::new(Box::new(|_| ok()), Box::new(xor_simulation)).available(&ToolKind::ALL),
    );

    let state = pipeline(
        Some(design("xor2", XOR_RTL, "// tb")),
        ScriptedReviewer::new(vec![]),
        tools,
    )
    .run(&spec(XOR_SPEC), dir.path())
    .await
    .unwrap();

    assert_eq!(state.status(), RunStatus::Pass);
    let metrics = state.metrics().unwrap();
    assert_eq!(metrics.num_cells, Some(1));
    assert_eq!(metrics.num_wires, Some(3));
    assert_eq!(metrics.chip_area, Some(12.5));
    assert_eq!(state.diagram(), Some(dir.path().join("circuit.svg").as_path()));
}

#[tokio::test]
async fn test_post_pass_failure_keeps_pass() {
    let dir = TempDir::new().unwrap();
    let mut tools = ScriptedTools::new(Box::new(|_| ok()), Box::new(xor_simulation))
        .available(&ToolKind::ALL);
    tools.synthesize = ToolOutput::new(1, STAT, "ERROR: syntax");
    tools.diagram = false;

    let state = pipeline(
        Some(design("xor2", XOR_RTL, "// tb")),
        ScriptedReviewer::new(vec![]),
        Arc::new(tools),
    )
    .run(&spec(XOR_SPEC), dir.path())
    .await
    .unwrap();

    assert_eq!(state.status(), RunStatus::Pass);
    assert!(state.metrics().is_none());
    assert!(state.diagram().is_none());
}

#[tokio::test]
async fn test_zero_budget_still_runs_once() {
    let dir = TempDir::new().unwrap();
    let tools = Arc::new(ScriptedTools::new(
        Box::new(|_| ToolOutput::new(1, "", "error")),
        Box::new(|_| ok()),
    ));

    let state = pipeline(
        Some(design("counter", "module", "// tb")),
        ScriptedReviewer::new(vec![]),
        tools,
    )
    .with_config(PipelineConfig {
        max_retries: 0,
        ..Default::default()
    })
    .run(&spec(COUNTER_SPEC), dir.path())
    .await
    .unwrap();

    assert_eq!(state.iteration(), 1);
    assert_eq!(state.status(), RunStatus::Fail);
}

// --- report and benchmark ---------------------------------------------------

#[tokio::test]
async fn test_persist_artifacts() {
    let dir = TempDir::new().unwrap();
    let spec = spec(XOR_SPEC);
    let tools = Arc::new(
        ScriptedTools::new(Box::new(|_| ok()), Box::new(xor_simulation)).available(&ToolKind::ALL),
    );
    let state = pipeline(
        Some(design("xor2", XOR_RTL, "// tb")),
        ScriptedReviewer::new(vec![]),
        tools,
    )
    .run(&spec, dir.path())
    .await
    .unwrap();

    let report = RunReport::new(&spec.module_name, &state, 3);
    let written = persist_artifacts(&report, &state, dir.path()).await.unwrap();

    let dut = std::fs::read_to_string(written.final_dut.unwrap()).unwrap();
    assert_eq!(dut, XOR_RTL);
    let tb = std::fs::read_to_string(written.final_tb.unwrap()).unwrap();
    assert_eq!(tb, build_oracle(&spec).unwrap().testbench);
    assert!(written.metrics.is_some());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(written.report).unwrap()).unwrap();
    assert_eq!(json["final_status"], "PASS");
    assert_eq!(json["total_iterations"], 1);
    assert_eq!(json["spec_derived_tb"], true);
    assert_eq!(json["history"][0]["compile_rc"], 0);
    assert_eq!(json["history"][0]["action_type"], "FIX_FUNCTION");
    assert_eq!(json["history"][0]["oracle_verdict"], "pass");
}

#[tokio::test]
async fn test_persist_without_candidate() {
    let dir = TempDir::new().unwrap();
    let tools = Arc::new(ScriptedTools::new(Box::new(|_| ok()), Box::new(|_| ok())));
    let state = pipeline(None, ScriptedReviewer::new(vec![]), tools)
        .run(&spec(XOR_SPEC), dir.path())
        .await
        .unwrap();

    let report = RunReport::new("xor2", &state, 3);
    let written = persist_artifacts(&report, &state, dir.path()).await.unwrap();
    assert!(written.final_dut.is_none());
    assert!(!dir.path().join("final_dut.sv").exists());
    assert!(written.report.exists());
    assert_eq!(report.best_attempt, None);
}

#[tokio::test]
async fn test_persist_clears_previous_run() {
    let dir = TempDir::new().unwrap();
    let spec = spec(XOR_SPEC);

    let tools = Arc::new(
        ScriptedTools::new(Box::new(|_| ok()), Box::new(xor_simulation)).available(&ToolKind::ALL),
    );
    let passed = pipeline(
        Some(design("xor2", XOR_RTL, "// tb")),
        ScriptedReviewer::new(vec![]),
        tools,
    )
    .run(&spec, dir.path())
    .await
    .unwrap();
    let report = RunReport::new("xor2", &passed, 3);
    persist_artifacts(&report, &passed, dir.path()).await.unwrap();
    assert!(dir.path().join("final_dut.sv").exists());
    assert!(dir.path().join("metrics.json").exists());

    let tools = Arc::new(ScriptedTools::new(Box::new(|_| ok()), Box::new(|_| ok())));
    let aborted = pipeline(None, ScriptedReviewer::new(vec![]), tools)
        .run(&spec, dir.path())
        .await
        .unwrap();
    let report = RunReport::new("xor2", &aborted, 3);
    let written = persist_artifacts(&report, &aborted, dir.path()).await.unwrap();

    assert!(written.final_dut.is_none());
    assert!(!dir.path().join("final_dut.sv").exists());
    assert!(!dir.path().join("final_tb.sv").exists());
    assert!(!dir.path().join("metrics.json").exists());
    assert!(written.report.exists());
}

#[tokio::test]
async fn test_benchmark_counts_crashed_task() {
    let specs = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    std::fs::write(specs.path().join("a_xor.json"), XOR_SPEC).unwrap();
    std::fs::write(
        specs.path().join("b_crash.json"),
        XOR_SPEC.replace("\"xor2\"", "\"crash\""),
    )
    .unwrap();

    let tools = Arc::new(ScriptedTools::new(Box::new(|_| ok()), Box::new(xor_simulation)));
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(PanickingWriter { module: "crash" }),
        ScriptedReviewer::new(vec![]),
        tools,
    ));

    let summary = run_benchmark(pipeline, specs.path(), out.path(), 1)
        .await
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.results[1].spec, "b_crash.json");
    assert_eq!(summary.results[1].status, RunStatus::Fail);
    assert!(summary.results[1].error.is_some());
}

#[tokio::test]
async fn test_benchmark_over_directory() {
    let specs = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    std::fs::write(specs.path().join("a_xor.json"), XOR_SPEC).unwrap();
    std::fs::write(specs.path().join("b_xor.json"), XOR_SPEC).unwrap();
    std::fs::write(specs.path().join("c_broken.json"), r#"{"module_name": ""}"#).unwrap();
    std::fs::write(specs.path().join("notes.txt"), "ignored").unwrap();

    let tools = Arc::new(ScriptedTools::new(Box::new(|_| ok()), Box::new(xor_simulation)));
    let pipeline = Arc::new(pipeline(
        Some(design("xor2", XOR_RTL, "// tb")),
        ScriptedReviewer::new(vec![]),
        tools,
    ));

    let summary = run_benchmark(pipeline, specs.path(), out.path(), 2)
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.passed, 2);
    let names: Vec<&str> = summary.results.iter().map(|r| r.spec.as_str()).collect();
    assert_eq!(names, vec!["a_xor.json", "b_xor.json", "c_broken.json"]);
    assert!(summary.results[2].error.is_some());
    assert_eq!(summary.results[2].status, RunStatus::Fail);
    assert!(out.path().join("a_xor").join("final_dut.sv").exists());
    assert!(out.path().join("b_xor").join("report.json").exists());
}
