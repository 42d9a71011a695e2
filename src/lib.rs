//! RNA-seq expression normalization and exploration.
//!
//! This library provides the numeric core of a standard RNA-seq expression
//! workflow: loading a count matrix with sample metadata, filtering
//! low-count genes, TPM normalization against transcript lengths, and the
//! statistics behind the usual exploratory figures.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (CountMatrix, GeneLengthTable, Metadata)
//! - **profile**: Sequencing-depth profiling
//! - **filter**: Low-count gene filtering
//! - **normalize**: TPM / RPK normalization and log2 transform
//! - **summarize**: Per-condition mean expression
//! - **explore**: Sample distances and PCA
//! - **pipeline**: Workflow composition and execution
//!
//! # Example
//!
//! ```no_run
//! use rnaseq_expr::prelude::*;
//!
//! // Load data
//! let counts = CountMatrix::from_tsv("counts.tsv").unwrap();
//! let lengths = GeneLengthTable::from_tsv("lengths.tsv").unwrap();
//! let metadata = Metadata::from_tsv("metadata.tsv").unwrap();
//!
//! // Run the workflow
//! let output = Workflow::new()
//!     .filter_total_count(2)
//!     .normalize_tpm()
//!     .log2_transform(1.0)
//!     .average_by_condition("condition")
//!     .run(&counts, &lengths, &metadata)
//!     .unwrap();
//! ```

pub mod data;
pub mod error;
pub mod explore;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod profile;
pub mod summarize;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{CountMatrix, GeneLengthTable, Metadata, Variable, VariableType};
    pub use crate::error::{ExprError, Result};
    pub use crate::explore::{pca, sample_distances, PcaResult, SampleDistances, DEFAULT_N_TOP_GENES};
    pub use crate::filter::{filter_min_samples, filter_total_count, FilterResult};
    pub use crate::normalize::{
        log2_transform, norm_rpk, norm_tpm, Log2Matrix, RpkMatrix, TpmMatrix,
    };
    pub use crate::pipeline::{Workflow, WorkflowConfig, WorkflowOutput, WorkflowStep};
    pub use crate::profile::{profile_depth, DepthProfile};
    pub use crate::summarize::{condition_means, condition_means_for, ConditionMeans};
}
