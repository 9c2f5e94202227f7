//! Baseline evaluation CLI.
//!
//! Scores every discovered baseline results file against the ground-truth
//! corpus and writes one report file per baseline.
//!
//! ## Usage
//!
//! ```bash
//! # Evaluate all GOV baselines
//! cargo run -p datasearch-eval --bin compare_baselines -- \
//!     --data-dir data --results-dir results --output-dir baselines \
//!     --dataset GOV
//!
//! # Custom eligible eval types and cutoff
//! cargo run -p datasearch-eval --bin compare_baselines -- \
//!     --eval-types "dataset request" "implied dataset" --k 10
//! ```
//!
//! Expects `<results-dir>/<DATASET>/{LLMs,portals}/<system>_results.json`
//! and writes `<output-dir>/<DATASET>/<family>/<system>_baseline.json`.
//! Directory discovery lives here; the engine itself never touches the
//! filesystem layout.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use datasearch_eval::config::{EvalConfig, DEFAULT_ELIGIBLE_EVAL_TYPES};
use datasearch_eval::datasets::{load_baseline, load_ground_truth};
use datasearch_eval::runners::baseline::BaselineRunner;

/// Baseline families searched for result files.
const FAMILIES: [&str; 2] = ["LLMs", "portals"];

#[derive(Parser, Debug)]
#[command(name = "compare_baselines")]
#[command(about = "Score baseline dataset suggestions against curated ground truth")]
struct Args {
    /// Directory containing evaluation_dataset_<DATASET>.json.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory containing <DATASET>/{LLMs,portals}/*_results.json.
    #[arg(long, default_value = "results")]
    results_dir: PathBuf,

    /// Output directory for per-baseline report files.
    #[arg(long, default_value = "baselines")]
    output_dir: PathBuf,

    /// Corpus label ("GOV" or "LDS").
    #[arg(long, default_value = "GOV")]
    dataset: String,

    /// Eval types eligible for scoring and hallucination accounting.
    #[arg(long, num_args = 1.., default_values = DEFAULT_ELIGIBLE_EVAL_TYPES)]
    eval_types: Vec<String>,

    /// Ranking cutoff for NDCG@k.
    #[arg(long, default_value = "5")]
    k: usize,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = EvalConfig::new(args.dataset.clone(), &args.eval_types, args.k);

    let eval_path = args
        .data_dir
        .join(format!("evaluation_dataset_{}.json", config.dataset));
    let ground_truth = load_ground_truth(&eval_path)?;
    info!(
        conversations = ground_truth.len(),
        path = %eval_path.display(),
        "loaded ground truth"
    );

    let runner = BaselineRunner::new(config, ground_truth);

    let dataset_results = args.results_dir.join(&args.dataset);
    let baseline_files = discover_result_files(&dataset_results)?;
    if baseline_files.is_empty() {
        anyhow::bail!(
            "no *_results.json files found under {}",
            dataset_results.display()
        );
    }

    for (family, system, path) in &baseline_files {
        let baseline = load_baseline(path)?;
        let report = runner.run(&baseline);

        let out_dir = args.output_dir.join(&args.dataset).join(family);
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;
        let out_path = out_dir.join(format!("{system}_baseline.json"));
        report.save(&out_path)?;

        info!(
            baseline = %format!("{family}_{system}"),
            queries = report.counters.total_queries,
            hallucination_rate = report.summary.hallucination_rate,
            hallucination_frequency = report.summary.hallucination_frequency,
            output = %out_path.display(),
            "evaluated baseline"
        );
    }

    info!(baselines = baseline_files.len(), "evaluation complete");
    Ok(())
}

/// Find `<system>_results.json` files under each family directory.
///
/// Returns (family, system, path) triples sorted for a reproducible
/// processing order. Missing family directories are skipped.
fn discover_result_files(dataset_dir: &Path) -> Result<Vec<(String, String, PathBuf)>> {
    let mut found = Vec::new();
    for family in FAMILIES {
        let family_dir = dataset_dir.join(family);
        if !family_dir.is_dir() {
            continue;
        }
        for entry in fs::read_dir(&family_dir)
            .with_context(|| format!("failed to list {}", family_dir.display()))?
        {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(system) = name.strip_suffix("_results.json") {
                found.push((family.to_string(), system.to_string(), path.clone()));
            }
        }
    }
    found.sort();
    Ok(found)
}
