use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use rtlloop_agents::{
    api_key_from_env, Canonicalizer, GeminiModel, LlmReviewer, LlmWriter, TextModel,
};
use rtlloop_config::Settings;
use rtlloop_controller::{
    persist_artifacts, run_benchmark, Pipeline, PipelineState, RunReport, RunStatus,
};
use rtlloop_spec::{build_oracle, SpecError, SpecRecord};
use rtlloop_tools::Toolchain;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Longest RTL excerpt printed in the final report
const RTL_EXCERPT_CHARS: usize = 1200;

/// rtlloop - generate, verify and repair RTL with a text model in the loop
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (defaults to ./rtlloop.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the generate-verify-repair loop for one design
    #[command(group(ArgGroup::new("input").required(true).args(["spec", "text"])))]
    Run {
        /// Specification record (JSON)
        #[arg(short, long)]
        spec: Option<PathBuf>,

        /// Free-text description to extract a specification from
        #[arg(short, long)]
        text: Option<PathBuf>,

        /// Working directory for this run
        #[arg(short, long)]
        work_dir: Option<PathBuf>,

        /// Retry budget
        #[arg(short, long)]
        max_retries: Option<u32>,

        /// Skip synthesis and visualization after a PASS
        #[arg(long)]
        no_post_pass: bool,

        /// Skip Verilator lint
        #[arg(long)]
        no_lint: bool,
    },

    /// Run the loop over every *.json spec in a directory
    Bench {
        /// Directory of specification records
        specs_dir: PathBuf,

        /// Output directory (one subdirectory per spec)
        #[arg(short, long)]
        output: PathBuf,

        /// Specs processed concurrently
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,

        /// Retry budget per spec
        #[arg(short, long)]
        max_retries: Option<u32>,
    },

    /// Validate a specification record
    Validate {
        /// Specification record (JSON)
        spec: PathBuf,
    },

    /// Print the deterministic testbench derived from a specification
    Oracle {
        /// Specification record (JSON)
        spec: PathBuf,
    },

    /// Bounded model check of the assertions in an RTL file
    Formal {
        /// RTL source
        rtl: PathBuf,

        /// Top module (defaults to the file stem)
        #[arg(short, long)]
        top: Option<String>,

        /// Working directory (defaults to the RTL file's directory)
        #[arg(short, long)]
        work_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt().with_env_filter(log_level).init();

    match cli.command {
        Commands::Run {
            spec,
            text,
            work_dir,
            max_retries,
            no_post_pass,
            no_lint,
        } => {
            let settings = load_settings(cli.config.as_deref())?;
            let status = run_design(
                &settings,
                spec.as_deref(),
                text.as_deref(),
                work_dir,
                max_retries,
                no_post_pass,
                no_lint,
            )
            .await?;
            if status != RunStatus::Pass {
                std::process::exit(1);
            }
        }

        Commands::Bench {
            specs_dir,
            output,
            jobs,
            max_retries,
        } => {
            let settings = load_settings(cli.config.as_deref())?;
            bench(&settings, &specs_dir, &output, jobs, max_retries).await?;
        }

        Commands::Validate { spec } => {
            validate_spec(&spec)?;
        }

        Commands::Oracle { spec } => {
            print_oracle(&spec)?;
        }

        Commands::Formal { rtl, top, work_dir } => {
            let settings = load_settings(cli.config.as_deref())?;
            formal_check(&settings, &rtl, top, work_dir).await?;
        }
    }

    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    rtlloop_config::load(path).context("Failed to load settings")
}

fn text_model(settings: &Settings) -> Result<Arc<dyn TextModel>> {
    let key = api_key_from_env(&settings.model.api_key_env)?;
    let model = GeminiModel::new(&settings.model.name, key)?;
    info!("Using text model {}", model.model());
    Ok(Arc::new(model))
}

fn build_pipeline(
    settings: &Settings,
    model: Arc<dyn TextModel>,
    max_retries: Option<u32>,
) -> Pipeline {
    let mut config = settings.pipeline_config();
    if let Some(max_retries) = max_retries {
        config.max_retries = max_retries;
    }
    Pipeline::new(
        Arc::new(LlmWriter::new(model.clone())),
        Arc::new(LlmReviewer::new(model)),
        Arc::new(settings.toolchain()),
    )
    .with_config(config)
}

fn load_spec(path: &Path) -> Result<SpecRecord> {
    rtlloop_spec::from_path(path)
        .with_context(|| format!("Failed to load specification {}", path.display()))
}

async fn run_design(
    settings: &Settings,
    spec_path: Option<&Path>,
    text_path: Option<&Path>,
    work_dir: Option<PathBuf>,
    max_retries: Option<u32>,
    no_post_pass: bool,
    no_lint: bool,
) -> Result<RunStatus> {
    let model = text_model(settings)?;

    let spec = match (spec_path, text_path) {
        (Some(path), _) => load_spec(path)?,
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let spec = Canonicalizer::new(model.clone()).from_text(&text).await?;
            println!("📝 Extracted spec: {}", spec.module_name);
            println!("{}", "-".repeat(40));
            println!("{}", spec.summary());
            println!("{}", "-".repeat(40));
            spec
        }
        (None, None) => bail!("Either --spec or --text is required"),
    };

    let mut pipeline = build_pipeline(settings, model, max_retries);
    let mut config = pipeline.config().clone();
    config.run_post_pass &= !no_post_pass;
    config.use_lint &= !no_lint;
    pipeline = pipeline.with_config(config);

    let work_dir = work_dir.unwrap_or_else(|| settings.work_dir.clone());
    let state = pipeline
        .run(&spec, &work_dir)
        .await
        .context("Pipeline run failed")?;

    let report = RunReport::new(&spec.module_name, &state, pipeline.config().max_retries);
    let written = persist_artifacts(&report, &state, &work_dir).await?;
    print_final_report(&state, &report, written.final_dut.as_deref(), written.final_tb.as_deref());

    println!("\n--- Report ---");
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("💾 Report: {}", written.report.display());

    Ok(state.status())
}

fn print_final_report(
    state: &PipelineState,
    report: &RunReport,
    final_dut: Option<&Path>,
    final_tb: Option<&Path>,
) {
    println!("\n{}", "=".repeat(60));
    println!("  FINAL REPORT");
    println!("{}", "=".repeat(60));
    println!("Status:      {}", state.status());
    println!(
        "Iterations:  {} / {}",
        state.iteration(),
        report.max_retries
    );

    let Some(best) = state.best_candidate() else {
        println!("❌ No passing candidate found.");
        return;
    };
    println!("Best: Attempt {} ({})", best.attempt, best.status);

    if let (Some(dut), Some(tb)) = (final_dut, final_tb) {
        println!("\n💾 Saved: {}, {}", dut.display(), tb.display());
    }
    if let Some(metrics) = state.metrics() {
        println!("\n📐 Metrics:");
        if let Some(area) = metrics.chip_area {
            println!("   Chip area: {}", area);
        }
        if let Some(cells) = metrics.num_cells {
            println!("   Cells:     {}", cells);
        }
        if let Some(wires) = metrics.num_wires {
            println!("   Wires:     {}", wires);
        }
    }
    if let Some(diagram) = state.diagram() {
        println!("🖼️  Diagram: {}", diagram.display());
    }

    println!("\n--- RTL (excerpt) ---");
    let excerpt: String = best.rtl_code.chars().take(RTL_EXCERPT_CHARS).collect();
    let truncated = best.rtl_code.chars().count() > RTL_EXCERPT_CHARS;
    println!("{}{}", excerpt, if truncated { "..." } else { "" });
}

async fn bench(
    settings: &Settings,
    specs_dir: &Path,
    output: &Path,
    jobs: usize,
    max_retries: Option<u32>,
) -> Result<()> {
    let model = text_model(settings)?;
    let pipeline = Arc::new(build_pipeline(settings, model, max_retries));

    let summary = run_benchmark(pipeline, specs_dir, output, jobs)
        .await
        .context("Benchmark failed")?;

    for entry in &summary.results {
        let mark = if entry.status == RunStatus::Pass { "✅" } else { "❌" };
        match &entry.error {
            Some(error) => println!("{} {} ({})", mark, entry.spec, error),
            None => println!(
                "{} {} ({} iteration(s))",
                mark, entry.spec, entry.iterations
            ),
        }
    }
    println!("\n{}/{} passed", summary.passed, summary.total);

    let path = output.join("benchmark.json");
    std::fs::write(&path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("💾 Summary: {}", path.display());
    Ok(())
}

fn validate_spec(path: &Path) -> Result<()> {
    match rtlloop_spec::from_path(path) {
        Ok(spec) => {
            println!("✅ {} is valid\n", path.display());
            println!("{}", spec.summary());
            Ok(())
        }
        Err(SpecError::Invalid(problems)) => {
            println!("❌ {} is invalid:", path.display());
            for problem in &problems {
                println!("   - {}", problem);
            }
            bail!("{} validation error(s)", problems.len())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load {}", path.display())),
    }
}

fn print_oracle(path: &Path) -> Result<()> {
    let spec = load_spec(path)?;
    match build_oracle(&spec) {
        Some(oracle) => print!("{}", oracle.testbench),
        None => println!(
            "No deterministic testbench can be derived for '{}' (needs a truth table)",
            spec.module_name
        ),
    }
    Ok(())
}

async fn formal_check(
    settings: &Settings,
    rtl: &Path,
    top: Option<String>,
    work_dir: Option<PathBuf>,
) -> Result<()> {
    if !rtl.is_file() {
        bail!("RTL file not found: {}", rtl.display());
    }
    let rtl = &rtl
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", rtl.display()))?;
    let top = match top {
        Some(top) => top,
        None => rtl
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .context("Cannot derive a top module name from the file name")?,
    };
    let work_dir = match work_dir {
        Some(dir) => dir,
        None => rtl
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    std::fs::create_dir_all(&work_dir)
        .with_context(|| format!("Failed to create {}", work_dir.display()))?;

    let toolchain = settings.toolchain();
    let availability = toolchain.probe();
    let result = toolchain
        .formal_check(rtl, &top, &work_dir, &availability)
        .await;

    match result.passed {
        None if !result.available => println!("⚠️  {}", result.output.stderr),
        None => println!("❌ Formal check could not run: {}", result.output.stderr),
        Some(true) => println!("✅ Bounded model check passed for {}", top),
        Some(false) => {
            println!("❌ Bounded model check failed for {}", top);
            println!("{}", result.output.stdout);
            std::process::exit(1);
        }
    }
    Ok(())
}
