//! Per-turn retrieval quality metrics.
//!
//! ## Metrics
//!
//! - **Precision / Recall / F1**: set-based over deduplicated normalized
//!   titles.
//! - **Average relevance**: mean graded relevance over matched titles only,
//!   so over-generation of duplicated correct titles does not inflate it.
//! - **NDCG@k**: ranked gain over the raw, rank-ordered prediction list.
//! - **Hallucination rate**: raw flagged entries over deduplicated
//!   predictions; can exceed 1.0 and is not clamped at this layer.
//!
//! All guards against empty sets return 0 rather than erroring; a turn with
//! no ground truth is never scored.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::datasets::GroundTruthItem;
use crate::normalize::normalize_title;

/// Default ranking cutoff for NDCG.
pub const DEFAULT_NDCG_K: usize = 5;

/// Round half away from zero to `decimals` places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Graded relevance of a predicted title against a turn's ground truth.
///
/// The predicted title is normalized and compared against each ground-truth
/// title (also normalized) in the given order; the first match wins and an
/// unmatched title scores 0. Duplicate normalized titles with conflicting
/// grades are a caller defect; resolution stays deterministic rather than
/// erroring.
pub fn relevance_score(title: &str, ground_truth: &[GroundTruthItem]) -> i64 {
    let norm = normalize_title(title);
    for item in ground_truth {
        if norm == normalize_title(&item.dataset_title) {
            return item.relevance;
        }
    }
    0
}

fn dcg(grades: impl Iterator<Item = i64>) -> f64 {
    grades
        .enumerate()
        .map(|(i, rel)| (2f64.powi(rel as i32) - 1.0) / (i as f64 + 2.0).log2())
        .sum()
}

/// NDCG@k over relevance grades in prediction rank order.
///
/// The ideal ordering is the full grade multiset sorted descending, then
/// truncated to `k`; a relevant item ranked beyond `k` therefore still
/// raises the ideal and lowers the score. Returns exactly 0.0 when the
/// ideal DCG is 0 (no relevant items at all). Fewer than `k` grades simply
/// contribute what exists; no zero padding. Rounded to 3 decimals.
pub fn ndcg_at_k(relevance_scores: &[i64], k: usize) -> f64 {
    let observed = dcg(relevance_scores.iter().copied().take(k));

    let mut ideal: Vec<i64> = relevance_scores.to_vec();
    ideal.sort_unstable_by(|a, b| b.cmp(a));
    let best = dcg(ideal.into_iter().take(k));

    if best > 0.0 {
        round_to(observed / best, 3)
    } else {
        0.0
    }
}

/// Scored metrics for one evaluated turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub avg_relevance: f64,
    pub ndcg: f64,
    /// Raw hallucination entries over deduplicated normalized predictions.
    /// May legitimately exceed 1.0; display layers clamp, this one does not.
    pub hallucination_rate: f64,
}

impl TurnMetrics {
    /// Metric fields by name, in reporting order.
    pub fn fields(&self) -> [(&'static str, f64); 6] {
        [
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1", self.f1),
            ("avg_relevance", self.avg_relevance),
            ("ndcg", self.ndcg),
            ("hallucination_rate", self.hallucination_rate),
        ]
    }
}

/// Score one query turn.
///
/// Returns `None` when `ground_truth` is empty; callers surface that as the
/// "skipped (no ground truth)" sentinel. `predictions` is the raw
/// rank-ordered list (duplicates allowed); `hallucinations` are counted as
/// given, without deduplication or normalization.
///
/// Rounding: precision, recall, f1 and hallucination_rate to 3 decimals,
/// avg_relevance to 2, ndcg to 3 (inherited from [`ndcg_at_k`]).
pub fn evaluate_turn(
    predictions: &[String],
    ground_truth: &[GroundTruthItem],
    hallucinations: &[String],
    k: usize,
) -> Option<TurnMetrics> {
    if ground_truth.is_empty() {
        return None;
    }

    let pred_set: HashSet<String> = predictions.iter().map(|t| normalize_title(t)).collect();
    let gold_set: HashSet<String> = ground_truth
        .iter()
        .map(|item| normalize_title(&item.dataset_title))
        .collect();

    let true_positives: Vec<&String> = pred_set.intersection(&gold_set).collect();

    let precision = if pred_set.is_empty() {
        0.0
    } else {
        true_positives.len() as f64 / pred_set.len() as f64
    };
    // gold_set is non-empty here, but the guard stays.
    let recall = if gold_set.is_empty() {
        0.0
    } else {
        true_positives.len() as f64 / gold_set.len() as f64
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    let avg_relevance = if true_positives.is_empty() {
        0.0
    } else {
        let total: i64 = true_positives
            .iter()
            .map(|t| relevance_score(t, ground_truth))
            .sum();
        total as f64 / true_positives.len() as f64
    };

    let rel_scores: Vec<i64> = predictions
        .iter()
        .map(|t| relevance_score(t, ground_truth))
        .collect();
    let ndcg = ndcg_at_k(&rel_scores, k);

    let hallucination_rate = if pred_set.is_empty() {
        0.0
    } else {
        hallucinations.len() as f64 / pred_set.len() as f64
    };

    Some(TurnMetrics {
        precision: round_to(precision, 3),
        recall: round_to(recall, 3),
        f1: round_to(f1, 3),
        avg_relevance: round_to(avg_relevance, 2),
        ndcg,
        hallucination_rate: round_to(hallucination_rate, 3),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gt(items: &[(&str, i64)]) -> Vec<GroundTruthItem> {
        items
            .iter()
            .map(|(title, relevance)| GroundTruthItem {
                dataset_title: title.to_string(),
                relevance: *relevance,
            })
            .collect()
    }

    fn titles(items: &[&str]) -> Vec<String> {
        items.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn relevance_first_match_wins() {
        let truth = gt(&[("Census Data", 3), ("census   data", 1)]);
        assert_eq!(relevance_score("Census Data", &truth), 3);
    }

    #[test]
    fn relevance_unmatched_is_zero() {
        let truth = gt(&[("Census Data", 3)]);
        assert_eq!(relevance_score("Housing Survey", &truth), 0);
    }

    #[test]
    fn ndcg_perfect_ordering_is_one() {
        assert_eq!(ndcg_at_k(&[3, 2, 1], 5), 1.0);
    }

    #[test]
    fn ndcg_no_relevant_items_is_zero() {
        assert_eq!(ndcg_at_k(&[0, 0, 0], 5), 0.0);
        assert_eq!(ndcg_at_k(&[], 5), 0.0);
    }

    #[test]
    fn ndcg_penalizes_late_relevance() {
        let early = ndcg_at_k(&[3, 0, 0], 5);
        let late = ndcg_at_k(&[0, 0, 3], 5);
        assert!(early > late, "{early} vs {late}");
        assert_eq!(early, 1.0);
        // DCG = 7/log2(4) = 3.5, IDCG = 7
        assert_eq!(late, 0.5);
    }

    #[test]
    fn ndcg_invariant_to_cutoff_beyond_list_length() {
        let grades = [2, 0, 3];
        assert_eq!(ndcg_at_k(&grades, 3), ndcg_at_k(&grades, 5));
        assert_eq!(ndcg_at_k(&grades, 3), ndcg_at_k(&grades, 100));
    }

    #[test]
    fn ndcg_relevant_item_beyond_cutoff_lowers_score() {
        // Grade 3 sits at rank 6, outside k=5, but still raises the ideal.
        let grades = [1, 0, 0, 0, 0, 3];
        let score = ndcg_at_k(&grades, 5);
        assert!(score > 0.0 && score < 1.0, "{score}");
    }

    #[test]
    fn empty_ground_truth_is_not_scored() {
        assert_eq!(evaluate_turn(&titles(&["A"]), &[], &[], 5), None);
    }

    #[test]
    fn empty_predictions_yield_all_zeros() {
        let truth = gt(&[("Census Data", 3)]);
        let m = evaluate_turn(&[], &truth, &[], 5).unwrap();
        assert_eq!(
            m,
            TurnMetrics {
                precision: 0.0,
                recall: 0.0,
                f1: 0.0,
                avg_relevance: 0.0,
                ndcg: 0.0,
                hallucination_rate: 0.0,
            }
        );
    }

    #[test]
    fn exact_match_yields_perfect_scores() {
        let truth = gt(&[("Census Data, 2020", 3), ("Housing Survey", 1)]);
        let preds = titles(&["census data,2020", "Housing   Survey"]);
        let m = evaluate_turn(&preds, &truth, &[], 5).unwrap();
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.f1, 1.0);
        assert_eq!(m.avg_relevance, 2.0);
        assert_eq!(m.ndcg, 1.0);
    }

    #[test]
    fn partial_match_census_example() {
        let truth = gt(&[("Census Data, 2020", 3), ("Housing Survey", 1)]);
        // Cosmetic variation of the first title plus one miss.
        let preds = titles(&["Census   Data , 2020", "Unrelated Dataset"]);
        let m = evaluate_turn(&preds, &truth, &[], 5).unwrap();
        assert_eq!(m.precision, 0.5);
        assert_eq!(m.recall, 0.5);
        assert_eq!(m.f1, 0.5);
        assert_eq!(m.avg_relevance, 3.0);
        assert_eq!(m.hallucination_rate, 0.0);
    }

    #[test]
    fn duplicated_correct_titles_do_not_inflate_relevance() {
        let truth = gt(&[("Census Data", 4)]);
        let preds = titles(&["Census Data", "census  data", "CENSUS DATA"]);
        let m = evaluate_turn(&preds, &truth, &[], 5).unwrap();
        // All three collapse to one normalized prediction.
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.avg_relevance, 4.0);
    }

    #[test]
    fn hallucination_rate_can_exceed_one() {
        let truth = gt(&[("A", 1)]);
        let preds = titles(&["A"]);
        let hallucs = titles(&["A", "B", "C"]);
        let m = evaluate_turn(&preds, &truth, &hallucs, 5).unwrap();
        assert_eq!(m.hallucination_rate, 3.0);
    }

    #[test]
    fn round_to_behaves() {
        assert_eq!(round_to(0.6666666, 3), 0.667);
        assert_eq!(round_to(2.5, 2), 2.5);
        assert_eq!(round_to(1.0 / 3.0, 2), 0.33);
    }
}
