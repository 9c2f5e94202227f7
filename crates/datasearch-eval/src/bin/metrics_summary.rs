//! Baseline report summary CLI.
//!
//! Reduces persisted per-baseline report files to per-eval-type metric
//! means and prints them alongside each baseline's hallucination summary,
//! plus a cross-system comparison table. `--json` emits the aggregate as
//! JSON for downstream tooling instead of plots.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p datasearch-eval --bin metrics_summary -- \
//!     --baseline-dir baselines --dataset GOV
//!
//! cargo run -p datasearch-eval --bin metrics_summary -- --json > summary.json
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use datasearch_eval::report::{
    load_report, metric_or_zero, reduce_report, render_summary, AggregatedSummary,
};
use datasearch_eval::runners::baseline::BaselineSummary;

/// Baseline families searched for report files.
const FAMILIES: [&str; 2] = ["LLMs", "portals"];

/// Metrics shown in the cross-system comparison table.
const TABLE_METRICS: [&str; 5] = ["precision", "recall", "f1", "avg_relevance", "ndcg"];

#[derive(Parser, Debug)]
#[command(name = "metrics_summary")]
#[command(about = "Summarize per-baseline evaluation reports")]
struct Args {
    /// Directory containing <DATASET>/{LLMs,portals}/*_baseline.json.
    #[arg(long, default_value = "baselines")]
    baseline_dir: PathBuf,

    /// Corpus label ("GOV" or "LDS").
    #[arg(long, default_value = "GOV")]
    dataset: String,

    /// Emit the aggregate as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

/// One baseline's reduced output, as emitted by `--json`.
#[derive(Debug, Serialize)]
struct SystemSummary {
    summary: AggregatedSummary,
    baseline_summary: BaselineSummary,
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

    let dataset_dir = args.baseline_dir.join(&args.dataset);
    let report_files = discover_report_files(&dataset_dir)?;
    if report_files.is_empty() {
        anyhow::bail!(
            "no *_baseline.json files found under {}",
            dataset_dir.display()
        );
    }

    let mut systems: BTreeMap<String, SystemSummary> = BTreeMap::new();
    for (family, system, path) in &report_files {
        let records = load_report(path)?;
        let (summary, baseline_summary) = reduce_report(&records);
        let label = format!("{system} ({family})");
        info!(baseline = %label, records = records.len(), "reduced report");
        systems.insert(
            label,
            SystemSummary {
                summary,
                baseline_summary,
            },
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&systems)?);
        return Ok(());
    }

    for (label, system) in &systems {
        print!(
            "{}",
            render_summary(label, &system.summary, &system.baseline_summary)
        );
    }

    print_comparison_table(&systems);
    Ok(())
}

/// Cross-system table: one block per metric, rows are eval types, columns
/// are systems. Eval types absent from a baseline show as 0.000.
fn print_comparison_table(systems: &BTreeMap<String, SystemSummary>) {
    let eval_types: BTreeSet<&str> = systems
        .values()
        .flat_map(|s| s.summary.keys().map(String::as_str))
        .collect();
    if eval_types.is_empty() {
        return;
    }

    let width = eval_types.iter().map(|t| t.len()).max().unwrap_or(0).max(12);

    println!("\n=== Cross-system comparison ===");
    for metric in TABLE_METRICS {
        println!("\n{metric}:");
        print!("  {:width$}", "");
        for label in systems.keys() {
            print!("  {label:>20}");
        }
        println!();
        for eval_type in &eval_types {
            print!("  {eval_type:width$}");
            for system in systems.values() {
                let value = metric_or_zero(&system.summary, eval_type, metric);
                print!("  {value:>20.3}");
            }
            println!();
        }
    }

    println!("\nhallucination (baseline-level):");
    for (label, system) in systems {
        println!(
            "  {label}: rate {:.3}, frequency {:.3}",
            system.baseline_summary.hallucination_rate,
            system.baseline_summary.hallucination_frequency
        );
    }
}

/// Find `<system>_baseline.json` files under each family directory.
fn discover_report_files(dataset_dir: &Path) -> Result<Vec<(String, String, PathBuf)>> {
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
            if let Some(system) = name.strip_suffix("_baseline.json") {
                found.push((family.to_string(), system.to_string(), path.clone()));
            }
        }
    }
    found.sort();
    Ok(found)
}
