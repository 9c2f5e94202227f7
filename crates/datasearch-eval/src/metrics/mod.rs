//! Evaluation metrics.

pub mod retrieval;
