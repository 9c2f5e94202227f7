//! Reporting-side reduction of persisted baseline reports.
//!
//! Groups scored turn results by eval type and averages each metric across
//! turns of that type. Pure and re-derivable from the persisted report
//! file. One display-safety rule applies here and only here: each turn's
//! `hallucination_rate` is clamped to [0, 1] before it enters the mean,
//! distinct from the unclamped baseline-level rate in the trailing summary
//! record.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::canonical_eval_type;
use crate::metrics::retrieval::round_to;
use crate::runners::baseline::{BaselineSummary, ReportRecord};

/// Per-eval-type metric means: eval type → metric name → rounded mean.
pub type AggregatedSummary = BTreeMap<String, BTreeMap<String, f64>>;

/// Load a persisted baseline report.
pub fn load_report(path: &Path) -> Result<Vec<ReportRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read baseline report {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("malformed baseline report JSON in {}", path.display()))
}

/// Reduce a report to per-eval-type metric means plus its baseline summary.
///
/// Skip sentinels contribute nothing. Eval types are grouped in canonical
/// (trimmed, lowercased) form; means are rounded to 3 decimals.
pub fn reduce_report(records: &[ReportRecord]) -> (AggregatedSummary, BaselineSummary) {
    let mut sums: BTreeMap<String, BTreeMap<&'static str, (f64, usize)>> = BTreeMap::new();
    let mut baseline_summary = BaselineSummary::default();

    for record in records {
        match record {
            ReportRecord::Summary {
                baseline_summary: summary,
            } => baseline_summary = *summary,
            ReportRecord::Conversation(convo) => {
                for turn in &convo.turns {
                    let Some(metrics) = turn.result.as_scored() else {
                        continue;
                    };
                    let eval_type =
                        canonical_eval_type(turn.eval_type.as_deref().unwrap_or(""));
                    let per_metric = sums.entry(eval_type).or_default();
                    for (name, value) in metrics.fields() {
                        let value = if name == "hallucination_rate" {
                            value.clamp(0.0, 1.0)
                        } else {
                            value
                        };
                        let (sum, count) = per_metric.entry(name).or_insert((0.0, 0));
                        *sum += value;
                        *count += 1;
                    }
                }
            }
        }
    }

    let summary = sums
        .into_iter()
        .map(|(eval_type, per_metric)| {
            let means = per_metric
                .into_iter()
                .map(|(name, (sum, count))| (name.to_string(), round_to(sum / count as f64, 3)))
                .collect();
            (eval_type, means)
        })
        .collect();

    (summary, baseline_summary)
}

/// Mean of `metric` for `eval_type`, 0.0 when the type or metric is absent.
///
/// Eval types present in some baselines but not others render as 0 rather
/// than erroring.
pub fn metric_or_zero(summary: &AggregatedSummary, eval_type: &str, metric: &str) -> f64 {
    summary
        .get(eval_type)
        .and_then(|metrics| metrics.get(metric))
        .copied()
        .unwrap_or(0.0)
}

/// Render one baseline's summary for the console.
pub fn render_summary(
    label: &str,
    summary: &AggregatedSummary,
    baseline: &BaselineSummary,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{label} evaluation summary:\n"));
    for (eval_type, metrics) in summary {
        out.push_str(&format!("  {eval_type}:\n"));
        for (name, value) in metrics {
            out.push_str(&format!("     {name}: {value:.3}\n"));
        }
    }
    out.push_str("  --- baseline-level hallucination metrics ---\n");
    out.push_str(&format!(
        "     hallucination_rate: {:.3}\n",
        baseline.hallucination_rate
    ));
    out.push_str(&format!(
        "     hallucination_frequency: {:.3}\n",
        baseline.hallucination_frequency
    ));
    out
}
