//! Evaluation of dataset-search baselines against curated ground truth.
//!
//! Conversational dataset-discovery systems (LLMs and search portals) return
//! ranked dataset suggestions per query turn. This crate scores those
//! suggestions against a curated ground-truth corpus with graded relevance,
//! producing per-turn metrics and baseline-wide hallucination statistics
//! that are reproducible bit-for-bit across systems.
//!
//! ## Modules
//!
//! - [`normalize`]: canonicalizes dataset titles for cross-system comparison
//! - [`datasets`]: corpus data model and JSON loading
//! - [`metrics`]: relevance lookup, NDCG@k, per-turn precision/recall/F1
//! - [`runners`]: per-baseline aggregation and report persistence
//! - [`report`]: per-eval-type metric averaging for display
//! - [`config`]: run configuration (dataset label, eligible eval types, NDCG cutoff)
//!
//! ## Pipeline
//!
//! ```text
//! ground truth + <system>_results.json
//!     → BaselineRunner
//!     → <system>_baseline.json (per-turn records + trailing summary)
//!     → reduce_report (per-eval-type means)
//! ```
//!
//! Everything is single-threaded and synchronous: each baseline is processed
//! independently to completion over already-loaded in-memory data.

pub mod config;
pub mod datasets;
pub mod metrics;
pub mod normalize;
pub mod report;
pub mod runners;
