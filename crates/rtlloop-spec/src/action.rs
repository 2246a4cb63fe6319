//! Repair action categories
//!
//! Every failed attempt is assigned exactly one category. The category picks
//! the focus instruction that bounds what the next repair request may touch.

use crate::error::SpecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Focus used when a category name cannot be resolved
pub const GENERIC_REPAIR_FOCUS: &str = "Fix the reported errors.";

/// Discrete classification of a verification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionCategory {
    FixParse,
    FixPorts,
    FixWidth,
    FixType,
    FixFunction,
    FixReset,
    FixTiming,
    AskClarification,
}

impl ActionCategory {
    pub const ALL: [ActionCategory; 8] = [
        ActionCategory::FixParse,
        ActionCategory::FixPorts,
        ActionCategory::FixWidth,
        ActionCategory::FixType,
        ActionCategory::FixFunction,
        ActionCategory::FixReset,
        ActionCategory::FixTiming,
        ActionCategory::AskClarification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionCategory::FixParse => "FIX_PARSE",
            ActionCategory::FixPorts => "FIX_PORTS",
            ActionCategory::FixWidth => "FIX_WIDTH",
            ActionCategory::FixType => "FIX_TYPE",
            ActionCategory::FixFunction => "FIX_FUNCTION",
            ActionCategory::FixReset => "FIX_RESET",
            ActionCategory::FixTiming => "FIX_TIMING",
            ActionCategory::AskClarification => "ASK_CLARIFICATION",
        }
    }

    /// Short instruction handed to the repair collaborator
    pub fn repair_focus(&self) -> &'static str {
        match self {
            ActionCategory::FixParse => {
                "Fix syntax/parse errors. Check module structure, brackets, semicolons."
            }
            ActionCategory::FixPorts => {
                "Fix port/connection mismatches. Ensure DUT and TB port lists match."
            }
            ActionCategory::FixWidth => {
                "Fix bit width mismatches. Check signal widths and assignments."
            }
            ActionCategory::FixType => {
                "Fix type mismatches. Check reg vs wire, signed vs unsigned."
            }
            ActionCategory::FixFunction => {
                "Fix functional/logic errors. Verify behavior matches specification."
            }
            ActionCategory::FixReset => {
                "Fix reset behavior. Check reset polarity and initial state."
            }
            ActionCategory::FixTiming => "Fix timing. Check clock edges, delays, sequencing.",
            ActionCategory::AskClarification => {
                "Spec may be ambiguous. Proceed with best interpretation."
            }
        }
    }
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionCategory {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ActionCategory::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SpecError::UnknownAction(s.to_string()))
    }
}

/// Resolve a focus instruction from a category name; never fails
pub fn repair_focus_for(name: &str) -> &'static str {
    name.parse::<ActionCategory>()
        .map(|action| action.repair_focus())
        .unwrap_or(GENERIC_REPAIR_FOCUS)
}
