//! Specification record definitions

use crate::error::{Result, SpecError};
use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Write as _;

/// Fields that must be present in the JSON form of a record
const REQUIRED_FIELDS: [&str; 4] = ["module_name", "description", "inputs", "outputs"];

/// Characters of free text kept in the fallback record description
const FALLBACK_DESCRIPTION_CHARS: usize = 500;

/// Structured description of the circuit to build
///
/// Every optional field is always materialised: serialising a record writes
/// `null` for absent values, so consumers never need to tell a missing key
/// from an explicit null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRecord {
    /// Top-level module name
    pub module_name: String,

    /// What the circuit does
    pub description: String,

    /// Input ports, in declaration order
    #[serde(default)]
    pub inputs: Vec<PortSpec>,

    /// Output ports, in declaration order
    #[serde(default)]
    pub outputs: Vec<PortSpec>,

    /// Clock port name
    #[serde(default)]
    pub clock: Option<String>,

    /// Reset port name
    #[serde(default)]
    pub reset: Option<String>,

    /// Combinational truth table
    #[serde(default)]
    pub truth_table: Option<Vec<TruthRow>>,

    /// Declared state names
    #[serde(default)]
    pub fsm_states: Option<IndexSet<String>>,

    /// State transitions
    #[serde(default)]
    pub fsm_transitions: Option<Vec<FsmTransition>>,

    /// Free-text properties (documentation only)
    #[serde(default)]
    pub invariants: Option<Vec<String>>,

    /// Expected latency in cycles
    #[serde(default)]
    pub latency: Option<u32>,

    /// Provenance tag
    #[serde(default, deserialize_with = "lenient_source")]
    pub source: SpecSource,
}

/// A port declaration
///
/// Accepts either `{"name": .., "width": .., "description": ..}` or a bare
/// port name (width 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct PortSpec {
    pub name: String,
    pub width: u32,
    pub description: Option<String>,
}

impl PortSpec {
    pub fn new(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
            description: None,
        }
    }
}

impl TryFrom<Value> for PortSpec {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::String(name) => Ok(PortSpec::new(name, 1)),
            Value::Object(map) => {
                let name = map
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| "port entry is missing a string 'name'".to_string())?
                    .to_string();
                let width = match map.get("width") {
                    None | Some(Value::Null) => 1,
                    Some(w) => w
                        .as_u64()
                        .and_then(|w| u32::try_from(w).ok())
                        .ok_or_else(|| format!("port '{}' has a non-integer width: {}", name, w))?,
                };
                let description = map
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Ok(PortSpec {
                    name,
                    width,
                    description,
                })
            }
            other => Err(format!("port entry must be an object or a name, got {}", other)),
        }
    }
}

/// Where a record was extracted from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecSource {
    #[default]
    Text,
    Paper,
}

fn lenient_source<'de, D>(deserializer: D) -> std::result::Result<SpecSource, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value.as_ref().and_then(Value::as_str) {
        Some("paper") => SpecSource::Paper,
        _ => SpecSource::Text,
    })
}

/// One truth-table row
///
/// The JSON form is either nested `[[in0, in1, ...], out]` or flat
/// `[in0, in1, ..., out]`. Rows are always written back nested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Value>", into = "(Vec<u64>, u64)")]
pub struct TruthRow {
    pub inputs: Vec<u64>,
    pub output: u64,
}

impl TruthRow {
    pub fn new(inputs: Vec<u64>, output: u64) -> Self {
        Self { inputs, output }
    }
}

impl From<TruthRow> for (Vec<u64>, u64) {
    fn from(row: TruthRow) -> Self {
        (row.inputs, row.output)
    }
}

fn truth_value(value: &Value) -> std::result::Result<u64, String> {
    match value {
        Value::Bool(b) => Ok(u64::from(*b)),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| format!("truth-table value {} is not a non-negative integer", n)),
        other => Err(format!("truth-table value {} is not an integer", other)),
    }
}

impl TryFrom<Vec<Value>> for TruthRow {
    type Error = String;

    fn try_from(row: Vec<Value>) -> std::result::Result<Self, Self::Error> {
        match row.as_slice() {
            [Value::Array(inputs), output] => Ok(TruthRow {
                inputs: inputs.iter().map(truth_value).collect::<std::result::Result<_, _>>()?,
                output: truth_value(output)?,
            }),
            [Value::Array(_), ..] => Err(format!(
                "nested truth-table row must be [[inputs...], output], got {} elements",
                row.len()
            )),
            [inputs @ .., output] => Ok(TruthRow {
                inputs: inputs.iter().map(truth_value).collect::<std::result::Result<_, _>>()?,
                output: truth_value(output)?,
            }),
            [] => Err("truth-table row is empty".to_string()),
        }
    }
}

/// A finite-state-machine transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsmTransition {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub cond: String,
}

/// Prefix reserved for names local to generated testbenches
pub const TESTBENCH_PREFIX: &str = "__tb_";

fn fits_width(value: u64, width: u64) -> bool {
    width >= u64::from(u64::BITS) || value >> width == 0
}

/// Closest legal HDL identifier to `name`
pub fn sanitize_identifier(name: &str) -> String {
    let mut ident: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.chars().all(|c| c == '_') {
        return "design".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert_str(0, "m_");
    }
    ident
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

impl SpecRecord {
    /// Minimal record with only a name and description
    pub fn new(module_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            description: description.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            clock: None,
            reset: None,
            truth_table: None,
            fsm_states: None,
            fsm_transitions: None,
            invariants: None,
            latency: None,
            source: SpecSource::Text,
        }
    }

    /// Record used when free text could not be structured
    pub fn fallback(raw_text: &str, source: SpecSource) -> Self {
        let description: String = raw_text.chars().take(FALLBACK_DESCRIPTION_CHARS).collect();
        let mut spec = Self::new("design", description);
        spec.source = source;
        spec
    }

    /// Parse JSON text and validate the result
    pub fn from_json(text: &str) -> Result<Self> {
        let spec = Self::parse_json(text)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Build a record from an already-parsed JSON value and validate it
    pub fn from_value(value: Value) -> Result<Self> {
        let spec = Self::parse_value(value)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse JSON text into a record without validating it
    pub fn parse_json(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| SpecError::Parse(e.to_string()))?;
        Self::parse_value(value)
    }

    /// Shape check only: required fields present, every field well-typed
    pub fn parse_value(value: Value) -> Result<Self> {
        let Value::Object(map) = &value else {
            return Err(SpecError::Invalid(vec![
                "specification must be a JSON object".to_string(),
            ]));
        };

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|field| !map.contains_key(**field))
            .map(|field| format!("missing required field: {}", field))
            .collect();
        if !missing.is_empty() {
            return Err(SpecError::Invalid(missing));
        }

        serde_json::from_value(value).map_err(|e| SpecError::Parse(e.to_string()))
    }

    /// Check structural consistency, collecting every problem found
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.module_name.trim().is_empty() {
            errors.push("module_name must not be empty".to_string());
        } else if !is_identifier(&self.module_name) {
            errors.push(format!(
                "module_name '{}' is not a valid HDL identifier",
                self.module_name
            ));
        }

        if self.description.trim().is_empty() {
            errors.push("description must not be empty".to_string());
        }

        self.check_ports(&mut errors);
        errors.extend(self.truth_table_problems());

        if let (Some(states), Some(transitions)) = (&self.fsm_states, &self.fsm_transitions) {
            for (i, t) in transitions.iter().enumerate() {
                for endpoint in [&t.from, &t.to] {
                    if !states.contains(endpoint) {
                        errors.push(format!(
                            "fsm_transitions[{}] references undeclared state '{}'",
                            i, endpoint
                        ));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SpecError::Invalid(errors))
        }
    }

    fn check_ports(&self, errors: &mut Vec<String>) {
        let mut seen = HashSet::new();
        for port in self.inputs.iter().chain(&self.outputs) {
            if !is_identifier(&port.name) {
                errors.push(format!("port name '{}' is not a valid HDL identifier", port.name));
            } else if port.name.starts_with(TESTBENCH_PREFIX) {
                errors.push(format!(
                    "port name '{}' uses the reserved prefix '{}'",
                    port.name, TESTBENCH_PREFIX
                ));
            }
            if port.width == 0 {
                errors.push(format!("port '{}' must be at least 1 bit wide", port.name));
            }
            if !seen.insert(port.name.as_str()) {
                errors.push(format!("port '{}' is declared more than once", port.name));
            }
        }
    }

    /// Truth-table rows that disagree with each other or with the ports
    ///
    /// With declared inputs every row must drive each input exactly once
    /// with a value that fits its width. With declared outputs the expected
    /// value must fit their concatenation.
    pub fn truth_table_problems(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let Some(rows) = &self.truth_table else {
            return errors;
        };

        if self.inputs.is_empty() {
            let arity = rows.first().map_or(0, |row| row.inputs.len());
            for (i, row) in rows.iter().enumerate().skip(1) {
                if row.inputs.len() != arity {
                    errors.push(format!(
                        "truth_table row {} has {} inputs, expected {}",
                        i,
                        row.inputs.len(),
                        arity
                    ));
                }
            }
        } else {
            for (i, row) in rows.iter().enumerate() {
                if row.inputs.len() != self.inputs.len() {
                    errors.push(format!(
                        "truth_table row {} has {} inputs, but {} input ports are declared",
                        i,
                        row.inputs.len(),
                        self.inputs.len()
                    ));
                    continue;
                }
                for (value, port) in row.inputs.iter().zip(&self.inputs) {
                    if !fits_width(*value, u64::from(port.width)) {
                        errors.push(format!(
                            "truth_table row {}: value {} does not fit {}-bit input '{}'",
                            i, value, port.width, port.name
                        ));
                    }
                }
            }
        }

        if !self.outputs.is_empty() {
            let out_width: u64 = self.outputs.iter().map(|p| u64::from(p.width)).sum();
            for (i, row) in rows.iter().enumerate() {
                if !fits_width(row.output, out_width) {
                    errors.push(format!(
                        "truth_table row {}: expected output {} does not fit {} output bit(s)",
                        i, row.output, out_width
                    ));
                }
            }
        }

        errors
    }

    /// Make the module name a legal identifier and fill an empty description
    ///
    /// Used on records extracted from free text, where the model may return
    /// a display name such as `"XOR gate"`.
    pub fn repair_names(&mut self, raw_text: &str) {
        let name = sanitize_identifier(&self.module_name);
        if name != self.module_name {
            log::debug!("module name '{}' sanitized to '{}'", self.module_name, name);
            self.module_name = name;
        }
        if self.description.trim().is_empty() {
            self.description = raw_text.chars().take(FALLBACK_DESCRIPTION_CHARS).collect();
        }
    }

    /// Input arity of the truth table, if there is one
    pub fn truth_table_arity(&self) -> Option<usize> {
        self.truth_table
            .as_ref()
            .and_then(|rows| rows.first())
            .map(|row| row.inputs.len())
    }

    /// Human-readable summary used in model prompts
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "MODULE: {}", self.module_name);
        let _ = writeln!(out, "DESCRIPTION: {}", self.description);
        let _ = writeln!(out, "INPUTS: {}", render_ports(&self.inputs));
        let _ = write!(out, "OUTPUTS: {}", render_ports(&self.outputs));

        if let Some(clock) = &self.clock {
            let _ = write!(out, "\nCLOCK: {}", clock);
        }
        if let Some(reset) = &self.reset {
            let _ = write!(out, "\nRESET: {}", reset);
        }
        if let Some(rows) = self.truth_table.as_ref().filter(|r| !r.is_empty()) {
            let rendered: Vec<String> = rows
                .iter()
                .map(|row| {
                    let ins: Vec<String> = row.inputs.iter().map(u64::to_string).collect();
                    format!("[[{}], {}]", ins.join(", "), row.output)
                })
                .collect();
            let _ = write!(out, "\nTRUTH TABLE: [{}]", rendered.join(", "));
        }
        if let Some(states) = self.fsm_states.as_ref().filter(|s| !s.is_empty()) {
            let names: Vec<&str> = states.iter().map(String::as_str).collect();
            let _ = write!(out, "\nFSM STATES: {}", names.join(", "));
        }
        if let Some(transitions) = self.fsm_transitions.as_ref().filter(|t| !t.is_empty()) {
            let rendered: Vec<String> = transitions
                .iter()
                .map(|t| {
                    if t.cond.is_empty() {
                        format!("{} -> {}", t.from, t.to)
                    } else {
                        format!("{} -> {} when {}", t.from, t.to, t.cond)
                    }
                })
                .collect();
            let _ = write!(out, "\nFSM TRANSITIONS: {}", rendered.join("; "));
        }
        if let Some(invariants) = self.invariants.as_ref().filter(|i| !i.is_empty()) {
            let _ = write!(out, "\nINVARIANTS: {}", invariants.join("; "));
        }
        if let Some(latency) = self.latency {
            let _ = write!(out, "\nLATENCY: {} cycles", latency);
        }
        out
    }
}

fn render_ports(ports: &[PortSpec]) -> String {
    if ports.is_empty() {
        return "none".to_string();
    }
    ports
        .iter()
        .map(|p| {
            let bits = if p.width == 1 { "bit" } else { "bits" };
            match &p.description {
                Some(desc) => format!("{} ({} {}, {})", p.name, p.width, bits, desc),
                None => format!("{} ({} {})", p.name, p.width, bits),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
