//! Settings file structure

use crate::error::{ConfigError, Result};
use rtlloop_agents::{DEFAULT_API_KEY_VARS, DEFAULT_MODEL};
use rtlloop_controller::{PipelineConfig, DEFAULT_MAX_RETRIES};
use rtlloop_tools::formal::DEFAULT_DEPTH;
use rtlloop_tools::{ExternalToolchain, ToolTimeouts};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding `work_dir`
pub const WORK_DIR_ENV: &str = "RTL_WORK_DIR";

/// Contents of `rtlloop.toml`; every section is optional
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub model: ModelSettings,
    pub pipeline: PipelineSettings,
    pub tools: ToolSettings,
    /// Root for run working directories
    pub work_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: ModelSettings::default(),
            pipeline: PipelineSettings::default(),
            tools: ToolSettings::default(),
            work_dir: PathBuf::from("work"),
        }
    }
}

/// Text model selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSettings {
    pub name: String,
    /// Variables searched for the API key, in order
    pub api_key_env: Vec<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_VARS.iter().map(|v| v.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    pub max_retries: u32,
    pub run_post_pass: bool,
    pub use_lint: bool,
    pub check_oracle_verdict: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            run_post_pass: true,
            use_lint: true,
            check_oracle_verdict: true,
        }
    }
}

/// Per-tool time budgets in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolSettings {
    pub lint_timeout_secs: u64,
    pub compile_timeout_secs: u64,
    pub simulate_timeout_secs: u64,
    pub synthesize_timeout_secs: u64,
    pub visualize_timeout_secs: u64,
    pub formal_timeout_secs: u64,
    pub formal_depth: u32,
}

impl Default for ToolSettings {
    fn default() -> Self {
        let t = ToolTimeouts::default();
        Self {
            lint_timeout_secs: t.lint.as_secs(),
            compile_timeout_secs: t.compile.as_secs(),
            simulate_timeout_secs: t.simulate.as_secs(),
            synthesize_timeout_secs: t.synthesize.as_secs(),
            visualize_timeout_secs: t.visualize.as_secs(),
            formal_timeout_secs: t.formal.as_secs(),
            formal_depth: DEFAULT_DEPTH,
        }
    }
}

impl ToolSettings {
    pub fn timeouts(&self) -> ToolTimeouts {
        ToolTimeouts {
            lint: Duration::from_secs(self.lint_timeout_secs),
            compile: Duration::from_secs(self.compile_timeout_secs),
            simulate: Duration::from_secs(self.simulate_timeout_secs),
            synthesize: Duration::from_secs(self.synthesize_timeout_secs),
            visualize: Duration::from_secs(self.visualize_timeout_secs),
            formal: Duration::from_secs(self.formal_timeout_secs),
        }
    }

    fn named_timeouts(&self) -> [(&'static str, u64); 6] {
        [
            ("lint_timeout_secs", self.lint_timeout_secs),
            ("compile_timeout_secs", self.compile_timeout_secs),
            ("simulate_timeout_secs", self.simulate_timeout_secs),
            ("synthesize_timeout_secs", self.synthesize_timeout_secs),
            ("visualize_timeout_secs", self.visualize_timeout_secs),
            ("formal_timeout_secs", self.formal_timeout_secs),
        ]
    }
}

impl Settings {
    /// Apply environment overrides through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(WORK_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            log::debug!("{} overrides work_dir: {}", WORK_DIR_ENV, dir);
            self.work_dir = PathBuf::from(dir);
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|var| std::env::var(var).ok());
    }

    /// Check value ranges, collecting every problem
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.model.name.trim().is_empty() {
            errors.push("model.name must not be empty".to_string());
        }
        if self.model.api_key_env.is_empty() {
            errors.push("model.api_key_env must list at least one variable".to_string());
        }
        if self.pipeline.max_retries == 0 {
            errors.push("pipeline.max_retries must be at least 1".to_string());
        }
        for (name, secs) in self.tools.named_timeouts() {
            if secs == 0 {
                errors.push(format!("tools.{} must be greater than 0", name));
            }
        }
        if self.tools.formal_depth == 0 {
            errors.push("tools.formal_depth must be greater than 0".to_string());
        }
        if self.work_dir.as_os_str().is_empty() {
            errors.push("work_dir must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            max_retries: self.pipeline.max_retries,
            run_post_pass: self.pipeline.run_post_pass,
            use_lint: self.pipeline.use_lint,
            check_oracle_verdict: self.pipeline.check_oracle_verdict,
        }
    }

    pub fn toolchain(&self) -> ExternalToolchain {
        ExternalToolchain::new(self.tools.timeouts()).with_formal_depth(self.tools.formal_depth)
    }
}
