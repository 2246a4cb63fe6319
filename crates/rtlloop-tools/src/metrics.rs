//! Synthesis report parsing
//!
//! Reads the summary lines Yosys `stat` prints. Lines that are not found
//! leave the corresponding metric unset.

use serde::{Deserialize, Serialize};

/// Area and size figures from a synthesis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthMetrics {
    pub chip_area: Option<f64>,
    pub num_cells: Option<u64>,
    pub num_wires: Option<u64>,
}

impl SynthMetrics {
    /// Parse `stat` output
    pub fn parse(stdout: &str) -> Self {
        let mut metrics = SynthMetrics {
            chip_area: stdout
                .lines()
                .find(|l| l.contains("Chip area"))
                .and_then(value_after_colon),
            num_cells: stdout
                .lines()
                .find(|l| l.contains("Number of cells:"))
                .and_then(value_after_colon),
            num_wires: stdout
                .lines()
                .find(|l| l.contains("Number of wires:"))
                .and_then(value_after_colon),
        };

        // Newer Yosys prints "   42 cells" instead of "Number of cells: 42"
        if metrics.num_cells.is_none() {
            metrics.num_cells = stdout.lines().find_map(count_before_cells);
        }
        metrics
    }

    pub fn is_empty(&self) -> bool {
        self.chip_area.is_none() && self.num_cells.is_none() && self.num_wires.is_none()
    }
}

fn value_after_colon<T: std::str::FromStr>(line: &str) -> Option<T> {
    line.rsplit(':').next()?.trim().parse().ok()
}

fn count_before_cells(line: &str) -> Option<u64> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    tokens.windows(2).find_map(|pair| {
        let label = pair[1].to_ascii_lowercase();
        if label == "cells" || label == "cell" {
            pair[0].parse().ok()
        } else {
            None
        }
    })
}
