//! Tool availability probing
//!
//! The loop probes once per run and skips optional roles whose program is
//! missing for the rest of that run.

use crate::ToolKind;
use indexmap::IndexMap;
use std::env;
use std::path::{Path, PathBuf};

/// Location of each tool role's program, if it was found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolAvailability {
    found: IndexMap<ToolKind, Option<PathBuf>>,
}

impl ToolAvailability {
    /// Search `PATH` for every role's program
    pub fn probe() -> Self {
        let search_path = env::var_os("PATH").unwrap_or_default();
        let dirs: Vec<PathBuf> = env::split_paths(&search_path).collect();

        let found = ToolKind::ALL
            .into_iter()
            .map(|kind| (kind, find_in(&dirs, kind.program())))
            .collect();
        let availability = Self { found };
        log::debug!("tool availability: {:?}", availability.missing());
        availability
    }

    /// Availability with every role present, for scripted toolchains
    pub fn all() -> Self {
        Self::with(&ToolKind::ALL)
    }

    /// Availability with exactly `kinds` present
    pub fn with(kinds: &[ToolKind]) -> Self {
        let found = ToolKind::ALL
            .into_iter()
            .map(|kind| {
                let path = kinds
                    .contains(&kind)
                    .then(|| PathBuf::from(kind.program()));
                (kind, path)
            })
            .collect();
        Self { found }
    }

    pub fn is_available(&self, kind: ToolKind) -> bool {
        matches!(self.found.get(&kind), Some(Some(_)))
    }

    pub fn path(&self, kind: ToolKind) -> Option<&Path> {
        self.found.get(&kind).and_then(|p| p.as_deref())
    }

    /// Roles whose program was not found
    pub fn missing(&self) -> Vec<ToolKind> {
        self.found
            .iter()
            .filter(|(_, path)| path.is_none())
            .map(|(kind, _)| *kind)
            .collect()
    }
}

/// Find an executable named `program` in `dirs`
pub fn find_in(dirs: &[PathBuf], program: &str) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
