//! Run configuration for the evaluation engine.
//!
//! One [`EvalConfig`] is constructed at process start and passed into the
//! runner; there is no global mutable configuration state inside the engine.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::metrics::retrieval::DEFAULT_NDCG_K;

/// Eval types counted toward baseline-level hallucination metrics by default.
pub const DEFAULT_ELIGIBLE_EVAL_TYPES: [&str; 3] =
    ["described dataset", "dataset request", "implied dataset"];

/// Canonical form of an eval-type label: trimmed and lowercased.
///
/// Applied to both the configured set and every probe, making eligibility
/// checks case- and whitespace-insensitive.
pub fn canonical_eval_type(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Evaluation run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Corpus label, e.g. "GOV" or "LDS".
    pub dataset: String,

    /// Eval types eligible for scoring and frequency accounting, stored in
    /// canonical form.
    pub eligible_eval_types: HashSet<String>,

    /// Ranking cutoff for NDCG@k.
    pub ndcg_k: usize,
}

impl EvalConfig {
    pub fn new(
        dataset: impl Into<String>,
        eval_types: impl IntoIterator<Item = impl AsRef<str>>,
        ndcg_k: usize,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            eligible_eval_types: eval_types
                .into_iter()
                .map(|t| canonical_eval_type(t.as_ref()))
                .collect(),
            ndcg_k,
        }
    }

    /// Whether a turn's eval type gates it into scoring and hallucination
    /// accounting. A missing label never matches.
    pub fn is_eligible(&self, eval_type: Option<&str>) -> bool {
        match eval_type {
            Some(label) => self.eligible_eval_types.contains(&canonical_eval_type(label)),
            None => false,
        }
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self::new("GOV", DEFAULT_ELIGIBLE_EVAL_TYPES, DEFAULT_NDCG_K)
    }
}
