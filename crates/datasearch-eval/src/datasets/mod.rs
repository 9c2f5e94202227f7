//! Corpus data model and JSON loading.
//!
//! Two input corpora feed the engine:
//!
//! - **Ground truth** (`evaluation_dataset_<DATASET>.json`): curated
//!   conversations whose turns carry graded relevance labels under
//!   `eval.ground_truth_ld`.
//! - **Baseline results** (`<system>_results.json`): one file per system
//!   under evaluation, with rank-significant `top_results` and
//!   caller-flagged `hallucination` titles per turn.
//!
//! Both are plain JSON arrays of conversation records. Fields the engine
//! does not use are ignored, and sequence fields that are absent or `null`
//! deserialize as empty, so partially annotated corpora load cleanly.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// One curated ground-truth entry: a dataset title with a graded relevance.
///
/// Identity within a turn is the normalized title; duplicate normalized
/// titles in one turn are a data-quality defect (the resolver keeps the
/// first occurrence).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthItem {
    pub dataset_title: String,
    /// Graded relevance, 0 (irrelevant) and up.
    pub relevance: i64,
}

/// Evaluation payload attached to one curated turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnEval {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ground_truth_ld: Vec<GroundTruthItem>,
}

/// One turn of a curated conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundTruthTurn {
    #[serde(default)]
    pub eval: TurnEval,
}

/// One curated conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthConversation {
    pub conversation_id: String,
    #[serde(default)]
    pub turns: Vec<GroundTruthTurn>,
}

/// One turn produced by a baseline system. Read-only to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionTurn {
    /// Intent label gating scoring and hallucination accounting. Absent or
    /// null labels never match the eligible set, so such turns are
    /// conservatively skipped rather than mis-scored.
    #[serde(default)]
    pub eval_type: Option<String>,

    /// The user query for this turn.
    #[serde(default)]
    pub user: Option<String>,

    /// Predicted dataset titles, rank-significant, may be empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub top_results: Vec<String>,

    /// Titles the caller flagged as fabricated. May overlap `top_results`.
    #[serde(default, deserialize_with = "null_as_empty", rename = "hallucination")]
    pub hallucinations: Vec<String>,
}

/// One baseline conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionConversation {
    pub conversation_id: String,
    #[serde(default)]
    pub turns: Vec<PredictionTurn>,
}

/// Treat an explicit JSON `null` the same as an absent field.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Load the ground-truth corpus, keyed by conversation id.
pub fn load_ground_truth(path: &Path) -> Result<HashMap<String, GroundTruthConversation>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read ground truth file {}", path.display()))?;
    let conversations: Vec<GroundTruthConversation> = serde_json::from_str(&raw)
        .with_context(|| format!("malformed ground truth JSON in {}", path.display()))?;
    Ok(conversations
        .into_iter()
        .map(|c| (c.conversation_id.clone(), c))
        .collect())
}

/// Load one baseline's prediction corpus, preserving file order.
pub fn load_baseline(path: &Path) -> Result<Vec<PredictionConversation>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read baseline results file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("malformed baseline results JSON in {}", path.display()))
}
