//! Scores practice submissions and folds them into per-section progress.
//!
//! Objective kinds are compared against their answer key. Free-text kinds are
//! graded by the language model against a per-kind rubric; when the model is
//! unreachable or its reply does not fit the rubric, a neutral score is stored
//! instead.

mod rubric;
mod service;

pub use rubric::{Rubric, grading_schema};
pub use service::{FALLBACK_FEEDBACK, FALLBACK_SCORE, GradingService};
