//! Free text to specification record

use crate::error::AgentResult;
use crate::model::TextModel;
use crate::response::strip_markdown;
use rtlloop_spec::{SpecError, SpecRecord, SpecSource};
use std::sync::Arc;

pub struct Canonicalizer {
    model: Arc<dyn TextModel>,
}

impl Canonicalizer {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    pub fn prompt(raw_text: &str) -> String {
        format!(
            r#"You are an expert hardware design engineer. Extract a structured hardware specification from this description.

TEXT:
{raw_text}

Output ONLY valid JSON in this exact format (no markdown, no backticks):
{{
  "module_name": "<module name>",
  "description": "<what the circuit does>",
  "inputs": [{{"name": "<port>", "width": <bits>, "description": "<optional>"}}],
  "outputs": [{{"name": "<port>", "width": <bits>, "description": "<optional>"}}],
  "clock": "<clk port or null>",
  "reset": "<reset port or null>",
  "truth_table": [[<in1>, <in2>, ...], <out>] or null,
  "fsm_states": ["S0", "S1", ...] or null,
  "fsm_transitions": [{{"from": "S0", "to": "S1", "cond": "x"}}] or null,
  "invariants": ["<property>"] or null,
  "latency": <cycles or null>,
  "source": "text"
}}

If truth tables or FSM details are in the text, include them. Use null for missing optional fields."#
        )
    }

    /// One model call; an unusable reply yields the fallback record
    ///
    /// Only transport-level failures are returned as errors.
    pub async fn from_text(&self, raw_text: &str) -> AgentResult<SpecRecord> {
        let raw = self.model.generate(&Self::prompt(raw_text)).await?;
        Ok(record_from_reply(&raw, raw_text))
    }
}

/// Structured record from a reply, or the fallback built from `raw_text`
///
/// Only a reply that does not parse into a record falls back. A parsed
/// record that fails validation gets its names repaired; a truth table that
/// still disagrees with the ports is dropped so no oracle is derived from
/// it. Any remaining problems are logged and the record is kept.
pub fn record_from_reply(reply: &str, raw_text: &str) -> SpecRecord {
    let mut spec = match SpecRecord::parse_json(&strip_markdown(reply)) {
        Ok(spec) => spec,
        Err(e) => {
            log::warn!("could not parse extracted spec: {}", e);
            return SpecRecord::fallback(raw_text, SpecSource::Text);
        }
    };

    let Err(e) = spec.validate() else {
        return spec;
    };
    log::warn!("extracted spec is invalid: {}", e.problems().join("; "));
    spec.repair_names(raw_text);

    let table_problems = spec.truth_table_problems();
    if !table_problems.is_empty() {
        log::warn!(
            "dropping truth table of {}: {}",
            spec.module_name,
            table_problems.join("; ")
        );
        spec.truth_table = None;
    }

    if let Err(SpecError::Invalid(problems)) = spec.validate() {
        log::warn!(
            "keeping extracted spec {} with problems: {}",
            spec.module_name,
            problems.join("; ")
        );
    }
    spec
}
