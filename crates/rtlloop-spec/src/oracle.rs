//! Deterministic oracle builder
//!
//! Derives a testbench straight from a [`SpecRecord`] instead of asking a
//! model for one. Only truth tables are supported today; a state machine
//! needs an explicit mapping from states to observable outputs that the
//! record does not carry.
//!
//! The generated testbench prints one comparison line per row, counts
//! mismatches, and ends with either the [`PASS_SENTINEL`] line or a
//! [`FAIL_MARKER`] line followed by `$fatal`.

use crate::record::{PortSpec, SpecRecord, TruthRow, TESTBENCH_PREFIX};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Line printed when every row matched
pub const PASS_SENTINEL: &str = "PASS";

/// Prefix of the line printed when at least one row mismatched
pub const FAIL_MARKER: &str = "FAIL:";

/// Prefix of the per-row mismatch line
pub const MISMATCH_MARKER: &str = "MISMATCH";

/// What the oracle was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleKind {
    TruthTable,
    StateMachine,
}

/// A testbench derived from the specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Oracle {
    pub kind: OracleKind,
    pub testbench: String,
}

/// Verdict read back from the simulation output of an oracle testbench
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleVerdict {
    Pass,
    Fail,
    /// Neither marker was printed (simulation stopped early)
    Inconclusive,
}

impl OracleVerdict {
    pub fn from_output(stdout: &str) -> Self {
        let mut saw_pass = false;
        for line in stdout.lines().map(str::trim) {
            if line.starts_with(FAIL_MARKER) || line.starts_with(MISMATCH_MARKER) {
                return OracleVerdict::Fail;
            }
            if line == PASS_SENTINEL {
                saw_pass = true;
            }
        }
        if saw_pass {
            OracleVerdict::Pass
        } else {
            OracleVerdict::Inconclusive
        }
    }
}

/// Build a deterministic testbench for `spec`, if one can be derived
///
/// Absence of an oracle is a normal outcome.
pub fn build_oracle(spec: &SpecRecord) -> Option<Oracle> {
    if let Some(rows) = spec.truth_table.as_ref().filter(|rows| !rows.is_empty()) {
        return Some(Oracle {
            kind: OracleKind::TruthTable,
            testbench: truth_table_testbench(spec, rows),
        });
    }

    if spec.fsm_transitions.is_some() && spec.fsm_states.is_some() {
        return state_machine_testbench(spec).map(|testbench| Oracle {
            kind: OracleKind::StateMachine,
            testbench,
        });
    }

    None
}

/// Bits needed to hold `value` (at least one)
fn bits_for(value: u64) -> u32 {
    (u64::BITS - value.leading_zeros()).max(1)
}

fn declare(kind: &str, port: &PortSpec) -> String {
    if port.width > 1 {
        format!("  {} [{}:0] {};", kind, port.width - 1, port.name)
    } else {
        format!("  {} {};", kind, port.name)
    }
}

/// Input ports to drive; positional names when the record declares none
fn truth_inputs(spec: &SpecRecord, rows: &[TruthRow]) -> Vec<PortSpec> {
    if !spec.inputs.is_empty() {
        return spec.inputs.clone();
    }
    let arity = rows.first().map_or(0, |row| row.inputs.len());
    (0..arity)
        .map(|i| {
            let widest = rows
                .iter()
                .filter_map(|row| row.inputs.get(i))
                .copied()
                .max()
                .unwrap_or(0);
            PortSpec::new(format!("in{}", i), bits_for(widest))
        })
        .collect()
}

fn truth_outputs(spec: &SpecRecord, rows: &[TruthRow]) -> Vec<PortSpec> {
    if !spec.outputs.is_empty() {
        return spec.outputs.clone();
    }
    let widest = rows.iter().map(|row| row.output).max().unwrap_or(0);
    vec![PortSpec::new("out", bits_for(widest))]
}

fn truth_table_testbench(spec: &SpecRecord, rows: &[TruthRow]) -> String {
    let module = &spec.module_name;
    let inputs = truth_inputs(spec, rows);
    let outputs = truth_outputs(spec, rows);
    let out_width: u32 = outputs.iter().map(|p| p.width).sum();

    let in_names: Vec<&str> = inputs.iter().map(|p| p.name.as_str()).collect();
    let out_names: Vec<&str> = outputs.iter().map(|p| p.name.as_str()).collect();
    let in_concat = format!("{{{}}}", in_names.join(","));
    let out_concat = format!("{{{}}}", out_names.join(","));
    let connections: Vec<String> = in_names
        .iter()
        .chain(&out_names)
        .map(|n| format!(".{}({})", n, n))
        .collect();

    // Validation keeps port names out of the reserved prefix
    let errors = format!("{}errors", TESTBENCH_PREFIX);
    let instance = format!("{}dut", TESTBENCH_PREFIX);

    let mut tb = String::new();
    let _ = writeln!(tb, "`timescale 1ns/1ps");
    let _ = writeln!(tb, "module tb_{};", module);
    for port in &inputs {
        let _ = writeln!(tb, "{}", declare("reg", port));
    }
    for port in &outputs {
        let _ = writeln!(tb, "{}", declare("wire", port));
    }
    let _ = writeln!(tb, "  integer {};", errors);
    let _ = writeln!(tb, "  {} {} ({});", module, instance, connections.join(", "));
    let _ = writeln!(tb, "  initial begin");
    let _ = writeln!(tb, "    {} = 0;", errors);
    let _ = writeln!(tb, "    $display(\"Testing truth table\");");

    for (i, row) in rows.iter().enumerate() {
        let driven = in_names.len().min(row.inputs.len());
        let assigns: Vec<String> = in_names[..driven]
            .iter()
            .zip(&row.inputs)
            .map(|(name, value)| format!("{}={};", name, value))
            .collect();
        let expected = format!("{}'d{}", out_width, row.output);
        let _ = writeln!(tb, "    #1 {}", assigns.join(" "));
        let _ = writeln!(
            tb,
            "    #1 $display(\"in=%b out=%b exp=%b\", {}, {}, {});",
            in_concat, out_concat, expected
        );
        let _ = writeln!(tb, "    if ({} !== {}) begin", out_concat, expected);
        let _ = writeln!(tb, "      {0} = {0} + 1;", errors);
        let _ = writeln!(tb, "      $display(\"{} row {}\");", MISMATCH_MARKER, i);
        let _ = writeln!(tb, "    end");
    }

    let _ = writeln!(tb, "    if ({} == 0) begin", errors);
    let _ = writeln!(tb, "      $display(\"{}\");", PASS_SENTINEL);
    let _ = writeln!(tb, "    end else begin");
    let _ = writeln!(
        tb,
        "      $display(\"{} %0d mismatches\", {});",
        FAIL_MARKER, errors
    );
    let _ = writeln!(tb, "      $fatal(1, \"truth table mismatch\");");
    let _ = writeln!(tb, "    end");
    let _ = writeln!(tb, "    $finish;");
    let _ = writeln!(tb, "  end");
    let _ = write!(tb, "endmodule");
    tb
}

/// State-machine oracles are not derived yet.
///
/// Even with a clock, a reset and a port list, the record does not say how
/// the current state is observed or how a transition condition maps onto
/// input values, so any testbench would be a guess.
fn state_machine_testbench(spec: &SpecRecord) -> Option<String> {
    if spec.clock.is_none() || spec.reset.is_none() {
        log::debug!(
            "{}: no clock/reset mapping, state machine oracle unavailable",
            spec.module_name
        );
        return None;
    }
    if spec.inputs.is_empty() || spec.outputs.is_empty() {
        log::debug!(
            "{}: port interface not declared, state machine oracle unavailable",
            spec.module_name
        );
        return None;
    }
    log::debug!(
        "{}: state observation is ambiguous, falling back to the generated testbench",
        spec.module_name
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FsmTransition;

    fn xor_spec() -> SpecRecord {
        let mut spec = SpecRecord::new("xor2", "two-input xor");
        spec.inputs = vec![PortSpec::new("a", 1), PortSpec::new("b", 1)];
        spec.outputs = vec![PortSpec::new("y", 1)];
        spec.truth_table = Some(vec![
            TruthRow::new(vec![0, 0], 0),
            TruthRow::new(vec![0, 1], 1),
            TruthRow::new(vec![1, 0], 1),
            TruthRow::new(vec![1, 1], 0),
        ]);
        spec
    }

    #[test]
    fn test_truth_table_testbench_shape() {
        let oracle = build_oracle(&xor_spec()).unwrap();
        assert_eq!(oracle.kind, OracleKind::TruthTable);

        let tb = &oracle.testbench;
        assert!(tb.starts_with("`timescale 1ns/1ps\nmodule tb_xor2;"));
        assert!(tb.contains("  reg a;\n  reg b;\n  wire y;"));
        assert!(tb.contains("xor2 __tb_dut (.a(a), .b(b), .y(y));"));
        assert!(tb.contains("#1 a=1; b=0;"));
        assert!(tb.contains("$display(\"in=%b out=%b exp=%b\", {a,b}, {y}, 1'd1);"));
        assert_eq!(tb.matches("#1 $display").count(), 4);
        assert!(tb.contains("$display(\"PASS\");"));
        assert!(tb.trim_end().ends_with("endmodule"));
    }

    #[test]
    fn test_positional_ports_when_undeclared() {
        let mut spec = SpecRecord::new("mux", "select");
        spec.truth_table = Some(vec![
            TruthRow::new(vec![0, 2, 1], 2),
            TruthRow::new(vec![1, 2, 1], 1),
        ]);
        let tb = build_oracle(&spec).unwrap().testbench;
        assert!(tb.contains("  reg in0;\n  reg [1:0] in1;\n  reg in2;"));
        assert!(tb.contains("  wire [1:0] out;"));
        assert!(tb.contains("mux __tb_dut (.in0(in0), .in1(in1), .in2(in2), .out(out));"));
        assert!(tb.contains("2'd2"));
    }

    #[test]
    fn test_port_names_do_not_clash_with_locals() {
        let mut spec = SpecRecord::new("checker", "flags a mismatch");
        spec.inputs = vec![PortSpec::new("dut", 1)];
        spec.outputs = vec![PortSpec::new("errors", 1)];
        spec.truth_table = Some(vec![TruthRow::new(vec![0], 0), TruthRow::new(vec![1], 1)]);
        assert!(spec.validate().is_ok());

        let tb = build_oracle(&spec).unwrap().testbench;
        assert!(tb.contains("  wire errors;"));
        assert!(tb.contains("  integer __tb_errors;"));
        assert!(!tb.contains("integer errors;"));
        assert!(tb.contains("checker __tb_dut (.dut(dut), .errors(errors));"));
        assert!(tb.contains("__tb_errors = __tb_errors + 1;"));
        assert!(tb.contains("$display(\"FAIL: %0d mismatches\", __tb_errors);"));
    }

    #[test]
    fn test_oracle_is_deterministic() {
        let spec = xor_spec();
        assert_eq!(build_oracle(&spec), build_oracle(&spec));
    }

    #[test]
    fn test_no_oracle_without_table() {
        let mut spec = SpecRecord::new("counter", "counts");
        assert!(build_oracle(&spec).is_none());

        spec.truth_table = Some(Vec::new());
        assert!(build_oracle(&spec).is_none());
    }

    #[test]
    fn test_state_machine_yields_no_oracle() {
        let mut spec = SpecRecord::new("fsm", "toggles");
        spec.clock = Some("clk".into());
        spec.reset = Some("rst".into());
        spec.inputs = vec![PortSpec::new("go", 1)];
        spec.outputs = vec![PortSpec::new("busy", 1)];
        spec.fsm_states = Some(["IDLE", "RUN"].into_iter().map(String::from).collect());
        spec.fsm_transitions = Some(vec![FsmTransition {
            from: "IDLE".into(),
            to: "RUN".into(),
            cond: "go".into(),
        }]);
        assert!(build_oracle(&spec).is_none());
    }

    #[test]
    fn test_verdict_parsing() {
        assert_eq!(
            OracleVerdict::from_output("in=00 out=0 exp=0\nPASS\n"),
            OracleVerdict::Pass
        );
        assert_eq!(
            OracleVerdict::from_output("MISMATCH row 2\nFAIL: 1 mismatches"),
            OracleVerdict::Fail
        );
        assert_eq!(
            OracleVerdict::from_output("Testing truth table"),
            OracleVerdict::Inconclusive
        );
    }
}
