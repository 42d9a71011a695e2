//! Gene filtering applied before normalization.

pub mod low_count;

pub use low_count::{filter_min_samples, filter_total_count, FilterResult};
