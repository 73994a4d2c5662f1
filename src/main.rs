use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use log::{debug, info, LevelFilter};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

mod aggregate;
mod cache;
mod clones;
mod graph;
mod grid;
mod metrics;
mod pipeline;
mod report;
mod scan;

use cache::DiskCache;
use clonal_common::{AnalysisConfig, ModelConfig};
use pipeline::{CacheMode, WeekStatistics, Workflow};
use report::Report;

/// Command-line arguments for the clonal analysis
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model directory holding config.nls and netlogo_output/worlds/
    #[arg(short, long)]
    model_dir: PathBuf,

    /// Workflows to run, comma separated (default: all)
    #[arg(short, long, value_enum, value_delimiter = ',')]
    analysis: Vec<Workflow>,

    /// Analysis settings TOML (default: <MODEL_DIR>/analysis.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write aggregates to the cache after scanning, or load them instead of scanning
    #[arg(value_enum)]
    cache: Option<CacheMode>,
}

/// Locations inside a model directory.
#[derive(Debug, Clone)]
struct ModelPaths {
    root: PathBuf,
}

impl ModelPaths {
    fn new(root: &Path) -> Self {
        ModelPaths { root: root.to_path_buf() }
    }

    fn model_config(&self) -> PathBuf {
        self.root.join("config.nls")
    }

    fn analysis_config(&self) -> PathBuf {
        self.root.join("analysis.toml")
    }

    fn worlds(&self) -> PathBuf {
        self.root.join("netlogo_output").join("worlds")
    }

    fn analysis_output(&self) -> PathBuf {
        self.root.join("analysis_output")
    }

    fn run_log(&self) -> PathBuf {
        self.root.join("log")
    }
}

/// Appends `<timestamp> <workflow> DONE` to the model's run log.
fn log_done(path: &Path, workflow: Workflow) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open run log '{}'", path.display()))?;
    let stamp = chrono::Local::now().format("%Y/%m/%d %H:%M:%S");
    writeln!(file, "{} {} DONE", stamp, workflow.name())
        .with_context(|| format!("Failed to write run log '{}'", path.display()))?;
    Ok(())
}

fn load_analysis_config(args: &Args, paths: &ModelPaths) -> Result<AnalysisConfig> {
    match &args.config {
        Some(path) => AnalysisConfig::load(path),
        None => {
            let default_path = paths.analysis_config();
            if default_path.is_file() {
                AnalysisConfig::load(&default_path)
            } else {
                info!("No analysis config given, using defaults.");
                Ok(AnalysisConfig::default())
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    Builder::from_default_env()
        .filter(None, LevelFilter::Info)
        .init();

    info!("Starting Clonal Analysis...");
    let paths = ModelPaths::new(&args.model_dir);
    info!("Model directory: {}", paths.root.display());

    let workflows = if args.analysis.is_empty() {
        Workflow::all()
    } else {
        let mut selected = args.analysis.clone();
        selected.sort();
        selected.dedup();
        selected
    };
    info!("Workflows: {:?}", workflows);

    let model = ModelConfig::load(paths.model_config())?;
    info!(
        "Model runs {} weeks at induction {} ({})",
        model.weeks,
        model.induction_level,
        if model.tracks_mutants() { "mutant tracking" } else { "single population" }
    );
    let config = load_analysis_config(&args, &paths)?;
    debug!("Analysis settings: {:#?}", config);

    let output_dir = paths.analysis_output();
    let cache = DiskCache::new(&output_dir, config.cache.format);

    let start_time = Instant::now();
    let stats = match args.cache {
        Some(CacheMode::Use) => {
            info!("Loading aggregates from cache...");
            WeekStatistics::load(&workflows, &cache).context("Failed to load cached aggregates")?
        }
        mode => {
            let (stats, _) = pipeline::scan_directory(paths.worlds(), &workflows, &model, &config)?;
            if mode == Some(CacheMode::Save) {
                stats.save(&cache).context("Failed to cache aggregates")?;
            }
            stats
        }
    };
    info!("Aggregation finished in {:.2} s.", start_time.elapsed().as_secs_f64());

    let figures = Report::new(&output_dir, &config.sampling.local_weeks).build(&stats);
    info!("Rendering {} figure(s) to {}", figures.len(), output_dir.display());
    let rendered = clonal_plots::render_all(&figures)?;
    for workflow in &workflows {
        log_done(&paths.run_log(), *workflow)?;
    }

    info!("Clonal Analysis Complete ({} figures).", rendered);
    Ok(())
}
