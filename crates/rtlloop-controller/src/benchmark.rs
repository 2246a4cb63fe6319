//! Batch evaluation over a directory of specification files
//!
//! Each spec runs in its own working directory, so runs may overlap up to
//! the configured number of jobs.

use crate::error::{PipelineError, Result};
use crate::pipeline::Pipeline;
use crate::report::{persist_artifacts, RunReport};
use crate::state::RunStatus;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    /// Spec file name
    pub spec: String,
    pub status: RunStatus,
    pub iterations: u32,
    /// Why the file never reached the loop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub total: usize,
    pub passed: usize,
    pub results: Vec<BenchmarkEntry>,
}

/// `*.json` files in `dir`, sorted by name
pub fn spec_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PipelineError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn spec_name(spec_path: &Path) -> String {
    spec_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl BenchmarkEntry {
    fn failed(spec: String, error: String) -> Self {
        Self {
            spec,
            status: RunStatus::Fail,
            iterations: 0,
            error: Some(error),
        }
    }
}

async fn run_one(pipeline: &Pipeline, spec_path: &Path, output_dir: &Path) -> BenchmarkEntry {
    let name = spec_name(spec_path);
    let stem = spec_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.clone());

    let failed = |error: String| BenchmarkEntry::failed(name.clone(), error);

    let spec = match rtlloop_spec::from_path(spec_path) {
        Ok(spec) => spec,
        Err(e) => {
            log::warn!("{}: {}", name, e);
            return failed(e.to_string());
        }
    };

    let work_dir = output_dir.join(&stem);
    let state = match pipeline.run(&spec, &work_dir).await {
        Ok(state) => state,
        Err(e) => {
            log::warn!("{}: {}", name, e);
            return failed(e.to_string());
        }
    };

    let report = RunReport::new(&spec.module_name, &state, pipeline.config().max_retries);
    if let Err(e) = persist_artifacts(&report, &state, &work_dir).await {
        log::warn!("{}: could not persist artifacts: {}", name, e);
    }

    BenchmarkEntry {
        spec: name,
        status: state.status(),
        iterations: state.iteration(),
        error: None,
    }
}

/// Run every spec in `specs_dir`, at most `jobs` at a time
///
/// Results are listed in file-name order regardless of completion order.
pub async fn run_benchmark(
    pipeline: Arc<Pipeline>,
    specs_dir: &Path,
    output_dir: &Path,
    jobs: usize,
) -> Result<BenchmarkSummary> {
    let files = spec_files(specs_dir)?;
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| PipelineError::io(output_dir, e))?;
    log::info!("benchmark: {} spec(s), {} job(s)", files.len(), jobs.max(1));

    let names: Vec<String> = files.iter().map(|path| spec_name(path)).collect();
    let permits = Arc::new(Semaphore::new(jobs.max(1)));
    let mut tasks = JoinSet::new();
    for (index, path) in files.into_iter().enumerate() {
        let pipeline = Arc::clone(&pipeline);
        let permits = Arc::clone(&permits);
        let output_dir = output_dir.to_path_buf();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            (index, run_one(&pipeline, &path, &output_dir).await)
        });
    }

    let mut finished: Vec<Option<BenchmarkEntry>> = vec![None; names.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, entry)) => finished[index] = Some(entry),
            Err(e) => log::error!("benchmark task failed: {}", e),
        }
    }

    // A task that panicked still counts, as a failure under its file name
    let results: Vec<BenchmarkEntry> = finished
        .into_iter()
        .zip(names)
        .map(|(entry, name)| {
            entry.unwrap_or_else(|| {
                BenchmarkEntry::failed(name, "benchmark task did not complete".to_string())
            })
        })
        .collect();
    let passed = results
        .iter()
        .filter(|r| r.status == RunStatus::Pass)
        .count();
    Ok(BenchmarkSummary {
        total: results.len(),
        passed,
        results,
    })
}
