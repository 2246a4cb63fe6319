//! rtlloop control loop
//!
//! Drives a [`Writer`](rtlloop_agents::Writer) and
//! [`Reviewer`](rtlloop_agents::Reviewer) against a
//! [`Toolchain`](rtlloop_tools::Toolchain) until the design passes
//! verification or the retry budget runs out.
//!
//! ```text
//! INIT -> generate -> verify -> PASS -> post-pass
//!                       |
//!                       +-> FAIL -> classify -> repair -> verify ...
//! ```

pub mod benchmark;
pub mod classifier;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod state;

pub use benchmark::{run_benchmark, BenchmarkEntry, BenchmarkSummary};
pub use classifier::{classify, FailureClassifier, KeywordClassifier};
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineConfig, DEFAULT_MAX_RETRIES};
pub use report::{persist_artifacts, AttemptSummary, PersistedArtifacts, RunReport};
pub use state::{AttemptRecord, AttemptStatus, PipelineState, RunStatus};
