//! Exploratory statistics over normalized expression.
//!
//! These produce the numbers behind the usual QC figures (PCA, sample
//! distance heatmaps); plotting itself is left to the caller.

pub mod distance;
pub mod pca;

pub use distance::{sample_distances, SampleDistances};
pub use pca::{pca, PcaResult, DEFAULT_N_TOP_GENES};
