//! Per-baseline corpus aggregation.
//!
//! [`BaselineRunner`] drives one baseline file to completion. Per turn it
//! does two independent things:
//!
//! 1. **Frequency accounting**: when the turn's eval type is eligible, the
//!    hallucination counters advance, whether or not the turn has ground
//!    truth.
//! 2. **Scoring**: a turn without ground truth gets the
//!    `"skipped (no ground truth)"` sentinel regardless of eval type; an
//!    ineligible turn gets `"skipped"`; everything else is scored by the
//!    turn evaluator.
//!
//! Every turn's record is preserved in input order, and the run ends with a
//! [`BaselineSummary`] derived from the counters. The persisted report is a
//! JSON array of conversation records followed by one trailing
//! `{"baseline_summary": …}` record.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EvalConfig;
use crate::datasets::{GroundTruthConversation, PredictionConversation};
use crate::metrics::retrieval::{evaluate_turn, round_to, TurnMetrics};

/// Why a turn was not scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The turn has no ground truth; it is never scored, though it may
    /// still feed the hallucination counters.
    #[serde(rename = "skipped (no ground truth)")]
    NoGroundTruth,
    /// The eval type is not frequency-eligible.
    #[serde(rename = "skipped")]
    WrongEvalType,
}

/// Outcome of one turn: scored metrics or a skip sentinel.
///
/// Serialized untagged so the persisted report carries either the metrics
/// object or one of the two literal skip strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnOutcome {
    Scored(TurnMetrics),
    Skipped(SkipReason),
}

impl TurnOutcome {
    pub fn as_scored(&self) -> Option<&TurnMetrics> {
        match self {
            TurnOutcome::Scored(metrics) => Some(metrics),
            TurnOutcome::Skipped(_) => None,
        }
    }
}

/// One evaluated turn as persisted in the report file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub user: Option<String>,
    /// The baseline's original label, not canonicalized.
    pub eval_type: Option<String>,
    pub top_results: Vec<String>,
    pub hallucination: Vec<String>,
    pub result: TurnOutcome,
}

/// One conversation's evaluated turns, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversation_id: String,
    pub turns: Vec<TurnRecord>,
}

/// Baseline-level hallucination statistics.
///
/// `hallucination_rate` divides total flagged entries by total predictions
/// and is deliberately not clamped to [0, 1]; the raw signal that
/// hallucinations can outnumber predictions is preserved, and reporting
/// clamps only at display time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineSummary {
    pub hallucination_rate: f64,
    /// Fraction of eligible queries with at least one hallucination.
    pub hallucination_frequency: f64,
}

/// Counters accumulated over a baseline's frequency-eligible turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HallucinationCounters {
    pub total_queries: u64,
    pub total_predictions: u64,
    pub queries_with_halluc: u64,
    pub total_hallucinations: u64,
}

impl HallucinationCounters {
    /// Derive the baseline summary, guarding both zero denominators.
    pub fn summarize(&self) -> BaselineSummary {
        let rate = if self.total_predictions > 0 {
            self.total_hallucinations as f64 / self.total_predictions as f64
        } else {
            0.0
        };
        let frequency = if self.total_queries > 0 {
            self.queries_with_halluc as f64 / self.total_queries as f64
        } else {
            0.0
        };
        BaselineSummary {
            hallucination_rate: round_to(rate, 3),
            hallucination_frequency: round_to(frequency, 3),
        }
    }
}

/// One element of the persisted report file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportRecord {
    Conversation(ConversationRecord),
    Summary { baseline_summary: BaselineSummary },
}

/// Full output of one baseline run.
#[derive(Debug, Clone)]
pub struct BaselineReport {
    pub conversations: Vec<ConversationRecord>,
    pub counters: HallucinationCounters,
    pub summary: BaselineSummary,
}

impl BaselineReport {
    /// Persisted form: conversation records followed by the summary record.
    pub fn to_records(&self) -> Vec<ReportRecord> {
        let mut records: Vec<ReportRecord> = self
            .conversations
            .iter()
            .cloned()
            .map(ReportRecord::Conversation)
            .collect();
        records.push(ReportRecord::Summary {
            baseline_summary: self.summary,
        });
        records
    }

    /// Write the report as pretty-printed JSON in a single blocking write.
    ///
    /// The report is fully re-derivable from its inputs, so a partial write
    /// on crash is acceptable to lose.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_records())
            .context("failed to serialize baseline report")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write baseline report {}", path.display()))?;
        Ok(())
    }
}

/// Evaluates baseline prediction corpora against one ground-truth corpus.
#[derive(Debug)]
pub struct BaselineRunner {
    config: EvalConfig,
    ground_truth: HashMap<String, GroundTruthConversation>,
}

impl BaselineRunner {
    pub fn new(
        config: EvalConfig,
        ground_truth: HashMap<String, GroundTruthConversation>,
    ) -> Self {
        Self {
            config,
            ground_truth,
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate one baseline's conversations, in input order.
    ///
    /// A conversation with no matching ground-truth conversation is skipped
    /// entirely; out-of-corpus conversations are expected, not an error. A
    /// turn index beyond the curated conversation's turns is treated as
    /// having empty ground truth.
    pub fn run(&self, baseline: &[PredictionConversation]) -> BaselineReport {
        let mut counters = HallucinationCounters::default();
        let mut conversations = Vec::new();

        for convo in baseline {
            let Some(curated) = self.ground_truth.get(&convo.conversation_id) else {
                debug!(
                    conversation_id = %convo.conversation_id,
                    "no ground-truth conversation, skipping"
                );
                continue;
            };

            let mut turns = Vec::with_capacity(convo.turns.len());
            for (i, turn) in convo.turns.iter().enumerate() {
                let eligible = self.config.is_eligible(turn.eval_type.as_deref());

                if eligible {
                    counters.total_queries += 1;
                    counters.total_predictions += turn.top_results.len() as u64;
                    if !turn.hallucinations.is_empty() {
                        counters.queries_with_halluc += 1;
                        counters.total_hallucinations += turn.hallucinations.len() as u64;
                    }
                }

                let ground_truth = curated
                    .turns
                    .get(i)
                    .map(|t| t.eval.ground_truth_ld.as_slice())
                    .unwrap_or(&[]);

                let result = if !eligible && !ground_truth.is_empty() {
                    TurnOutcome::Skipped(SkipReason::WrongEvalType)
                } else {
                    match evaluate_turn(
                        &turn.top_results,
                        ground_truth,
                        &turn.hallucinations,
                        self.config.ndcg_k,
                    ) {
                        Some(metrics) => TurnOutcome::Scored(metrics),
                        None => TurnOutcome::Skipped(SkipReason::NoGroundTruth),
                    }
                };

                turns.push(TurnRecord {
                    user: turn.user.clone(),
                    eval_type: turn.eval_type.clone(),
                    top_results: turn.top_results.clone(),
                    hallucination: turn.hallucinations.clone(),
                    result,
                });
            }

            conversations.push(ConversationRecord {
                conversation_id: convo.conversation_id.clone(),
                turns,
            });
        }

        let summary = counters.summarize();
        BaselineReport {
            conversations,
            counters,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::{GroundTruthItem, GroundTruthTurn, PredictionTurn, TurnEval};

    fn curated(
        id: &str,
        turns: Vec<Vec<(&str, i64)>>,
    ) -> (String, GroundTruthConversation) {
        let convo = GroundTruthConversation {
            conversation_id: id.to_string(),
            turns: turns
                .into_iter()
                .map(|items| GroundTruthTurn {
                    eval: TurnEval {
                        ground_truth_ld: items
                            .into_iter()
                            .map(|(title, relevance)| GroundTruthItem {
                                dataset_title: title.to_string(),
                                relevance,
                            })
                            .collect(),
                    },
                })
                .collect(),
        };
        (id.to_string(), convo)
    }

    fn prediction_turn(
        eval_type: Option<&str>,
        top_results: &[&str],
        hallucinations: &[&str],
    ) -> PredictionTurn {
        PredictionTurn {
            eval_type: eval_type.map(String::from),
            user: Some("query".to_string()),
            top_results: top_results.iter().map(|t| t.to_string()).collect(),
            hallucinations: hallucinations.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn runner(ground_truth: Vec<(String, GroundTruthConversation)>) -> BaselineRunner {
        BaselineRunner::new(EvalConfig::default(), ground_truth.into_iter().collect())
    }

    #[test]
    fn conversation_without_ground_truth_is_skipped_entirely() {
        let runner = runner(vec![curated("c1", vec![vec![("A", 1)]])]);
        let baseline = vec![PredictionConversation {
            conversation_id: "unknown".to_string(),
            turns: vec![prediction_turn(Some("dataset request"), &["A"], &["B"])],
        }];

        let report = runner.run(&baseline);
        assert!(report.conversations.is_empty());
        // Skipped before any accounting.
        assert_eq!(report.counters, HallucinationCounters::default());
    }

    #[test]
    fn eligible_turn_is_scored_and_counted() {
        let runner = runner(vec![curated("c1", vec![vec![("Census Data", 3)]])]);
        let baseline = vec![PredictionConversation {
            conversation_id: "c1".to_string(),
            turns: vec![prediction_turn(
                Some("Dataset Request"),
                &["census data", "Other"],
                &["Other"],
            )],
        }];

        let report = runner.run(&baseline);
        let metrics = report.conversations[0].turns[0].result.as_scored().unwrap();
        assert_eq!(metrics.precision, 0.5);
        assert_eq!(metrics.recall, 1.0);
        assert_eq!(metrics.hallucination_rate, 0.5);

        assert_eq!(report.counters.total_queries, 1);
        assert_eq!(report.counters.total_predictions, 2);
        assert_eq!(report.counters.queries_with_halluc, 1);
        assert_eq!(report.counters.total_hallucinations, 1);
    }

    #[test]
    fn ineligible_turn_is_skipped_without_counting() {
        let runner = runner(vec![curated("c1", vec![vec![("A", 1)]])]);
        let baseline = vec![PredictionConversation {
            conversation_id: "c1".to_string(),
            turns: vec![prediction_turn(Some("chitchat"), &["A"], &["B"])],
        }];

        let report = runner.run(&baseline);
        assert_eq!(
            report.conversations[0].turns[0].result,
            TurnOutcome::Skipped(SkipReason::WrongEvalType)
        );
        assert_eq!(report.counters, HallucinationCounters::default());
    }

    #[test]
    fn missing_ground_truth_still_feeds_counters_for_eligible_turns() {
        // Eligible eval type, but the turn's ground-truth list is empty: the
        // two gates are independent.
        let runner = runner(vec![curated("c1", vec![vec![]])]);
        let baseline = vec![PredictionConversation {
            conversation_id: "c1".to_string(),
            turns: vec![prediction_turn(
                Some("implied dataset"),
                &["A", "B", "C"],
                &["X", "Y"],
            )],
        }];

        let report = runner.run(&baseline);
        assert_eq!(
            report.conversations[0].turns[0].result,
            TurnOutcome::Skipped(SkipReason::NoGroundTruth)
        );
        assert_eq!(report.counters.total_queries, 1);
        assert_eq!(report.counters.total_predictions, 3);
        assert_eq!(report.counters.queries_with_halluc, 1);
        assert_eq!(report.counters.total_hallucinations, 2);

        assert_eq!(report.summary.hallucination_rate, 0.667);
        assert_eq!(report.summary.hallucination_frequency, 1.0);
    }

    #[test]
    fn no_ground_truth_takes_precedence_over_wrong_type() {
        let runner = runner(vec![curated("c1", vec![vec![]])]);
        let baseline = vec![PredictionConversation {
            conversation_id: "c1".to_string(),
            turns: vec![prediction_turn(Some("chitchat"), &["A"], &[])],
        }];

        let report = runner.run(&baseline);
        assert_eq!(
            report.conversations[0].turns[0].result,
            TurnOutcome::Skipped(SkipReason::NoGroundTruth)
        );
    }

    #[test]
    fn baseline_turn_beyond_curated_turns_has_no_ground_truth() {
        let runner = runner(vec![curated("c1", vec![vec![("A", 1)]])]);
        let baseline = vec![PredictionConversation {
            conversation_id: "c1".to_string(),
            turns: vec![
                prediction_turn(Some("dataset request"), &["A"], &[]),
                prediction_turn(Some("dataset request"), &["A"], &[]),
            ],
        }];

        let report = runner.run(&baseline);
        assert!(report.conversations[0].turns[0].result.as_scored().is_some());
        assert_eq!(
            report.conversations[0].turns[1].result,
            TurnOutcome::Skipped(SkipReason::NoGroundTruth)
        );
        // Both turns were eligible, both counted.
        assert_eq!(report.counters.total_queries, 2);
    }

    #[test]
    fn zero_queries_summary_is_all_zero() {
        let counters = HallucinationCounters::default();
        assert_eq!(counters.summarize(), BaselineSummary::default());
    }

    #[test]
    fn skip_sentinels_serialize_as_literal_strings() {
        let no_gt = serde_json::to_value(TurnOutcome::Skipped(SkipReason::NoGroundTruth)).unwrap();
        assert_eq!(no_gt, serde_json::json!("skipped (no ground truth)"));

        let wrong = serde_json::to_value(TurnOutcome::Skipped(SkipReason::WrongEvalType)).unwrap();
        assert_eq!(wrong, serde_json::json!("skipped"));
    }

    #[test]
    fn report_records_round_trip_through_json() {
        let runner = runner(vec![curated("c1", vec![vec![("A", 2)]])]);
        let baseline = vec![PredictionConversation {
            conversation_id: "c1".to_string(),
            turns: vec![prediction_turn(Some("dataset request"), &["A"], &[])],
        }];

        let report = runner.run(&baseline);
        let records = report.to_records();
        let json = serde_json::to_string(&records).unwrap();
        let parsed: Vec<ReportRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, records);
        assert!(matches!(parsed.last(), Some(ReportRecord::Summary { .. })));
    }
}
