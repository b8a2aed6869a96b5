//! Survey dataset and the statistics computed over it.
//!
//! `Dataset` is loaded once from CSV and never mutated. `StatsEngine`
//! implements [`job_core::Compute`] so workers can answer any
//! [`job_core::StatRequest`] against it.

mod dataset;
mod engine;

pub use dataset::{Dataset, DatasetError, QUESTIONS_BEST_IS_MAX, QUESTIONS_BEST_IS_MIN, Row};
pub use engine::StatsEngine;
