//! Summaries derived from normalized expression.

pub mod condition_means;

pub use condition_means::{condition_means, condition_means_for, ConditionMeans};
