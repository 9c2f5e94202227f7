//! Evaluation runners.

pub mod baseline;
