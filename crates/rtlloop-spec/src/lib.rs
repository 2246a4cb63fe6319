//! rtlloop specification model
//!
//! This crate holds the data the generate-verify-repair loop is driven by:
//!
//! - [`SpecRecord`]: the validated description of the circuit to build
//! - [`ActionCategory`]: the discrete repair categories and their focus text
//! - [`build_oracle`]: testbenches derived mechanically from a record

pub mod action;
pub mod error;
pub mod oracle;
pub mod record;

pub use action::{repair_focus_for, ActionCategory, GENERIC_REPAIR_FOCUS};
pub use error::{Result, SpecError};
pub use oracle::{build_oracle, Oracle, OracleKind, OracleVerdict};
pub use record::{
    sanitize_identifier, FsmTransition, PortSpec, SpecRecord, SpecSource, TruthRow,
    TESTBENCH_PREFIX,
};

use std::path::Path;

/// Load and validate a specification record from a JSON file
pub fn from_path(path: impl AsRef<Path>) -> Result<SpecRecord> {
    let contents =
        std::fs::read_to_string(path.as_ref()).map_err(|e| SpecError::Io(e.to_string()))?;
    from_str(&contents)
}

/// Load and validate a specification record from JSON text
pub fn from_str(s: &str) -> Result<SpecRecord> {
    SpecRecord::from_json(s)
}
