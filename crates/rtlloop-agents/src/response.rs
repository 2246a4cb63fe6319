//! Coercion of model replies into structured values

use crate::error::{AgentError, AgentResult};
use serde::de::DeserializeOwned;

const FENCE: &str = "```";

/// Remove Markdown code fences
///
/// An opening fence (with optional language tag) at the start of a line is
/// dropped together with its line break; a closing fence at the end of a
/// line is dropped.
pub fn strip_markdown(raw: &str) -> String {
    let mut kept = Vec::new();
    for line in raw.trim().lines() {
        let mut line = line;
        if let Some(rest) = line.strip_prefix(FENCE) {
            let rest = rest.trim_start_matches(|c: char| c.is_ascii_lowercase());
            if rest.is_empty() {
                continue;
            }
            line = rest;
        }
        kept.push(line.strip_suffix(FENCE).unwrap_or(line));
    }
    kept.join("\n").trim().to_string()
}

/// Strip fences and deserialize the remaining JSON
pub fn parse_reply<T: DeserializeOwned>(raw: &str) -> AgentResult<T> {
    let cleaned = strip_markdown(raw);
    if cleaned.is_empty() {
        return Err(AgentError::MalformedResponse("reply is empty".to_string()));
    }
    Ok(serde_json::from_str(&cleaned)?)
}

/// Reject a reply whose code field is missing or blank
pub fn require_code(field: &str, value: &str) -> AgentResult<()> {
    if value.trim().is_empty() {
        return Err(AgentError::MalformedResponse(format!(
            "reply has no {}",
            field
        )));
    }
    Ok(())
}
