//! Low-count gene filtering.
//!
//! Genes with almost no reads carry no usable expression signal and inflate
//! every downstream matrix; they are dropped before normalization. Dropping
//! them afterwards would break the column-sum invariant of TPM.

use crate::data::CountMatrix;
use crate::error::{ExprError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Report of a filtering step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResult {
    /// Number of genes before filtering.
    pub n_before: usize,
    /// Number of genes after filtering.
    pub n_after: usize,
    /// Number of genes removed.
    pub n_removed: usize,
    /// Proportion of genes retained.
    pub proportion_retained: f64,
}

impl FilterResult {
    fn new(n_before: usize, n_after: usize) -> Self {
        Self {
            n_before,
            n_after,
            n_removed: n_before - n_after,
            proportion_retained: if n_before == 0 {
                0.0
            } else {
                n_after as f64 / n_before as f64
            },
        }
    }
}

/// Keep genes whose total count across all samples exceeds a threshold.
///
/// `min_total = 2` reproduces the common "row sum greater than 1" pre-filter
/// applied before differential-expression modeling.
pub fn filter_total_count(
    counts: &CountMatrix,
    min_total: u64,
) -> Result<(CountMatrix, FilterResult)> {
    let row_sums = counts.row_sums();

    let keep_indices: Vec<usize> = (0..counts.n_genes())
        .filter(|&row| row_sums[row] >= min_total)
        .collect();

    if keep_indices.is_empty() {
        return Err(ExprError::EmptyData(format!(
            "No genes have total count >= {}",
            min_total
        )));
    }

    let filtered = counts.subset_genes(&keep_indices)?;
    let result = FilterResult::new(counts.n_genes(), filtered.n_genes());
    log::info!(
        "Total-count filter (>= {}): kept {} of {} genes",
        min_total,
        result.n_after,
        result.n_before
    );
    Ok((filtered, result))
}

/// Keep genes detected with at least `min_count` reads in at least
/// `min_samples` samples.
///
/// This is the standard expression filter for designs with replicates:
/// `min_samples` is usually the size of the smallest condition group.
pub fn filter_min_samples(
    counts: &CountMatrix,
    min_count: u64,
    min_samples: usize,
) -> Result<(CountMatrix, FilterResult)> {
    if min_samples == 0 {
        return Err(ExprError::InvalidParameter(
            "min_samples must be at least 1".to_string(),
        ));
    }
    if min_samples > counts.n_samples() {
        return Err(ExprError::InvalidParameter(format!(
            "min_samples ({}) exceeds sample count ({})",
            min_samples,
            counts.n_samples()
        )));
    }

    let keep_indices: Vec<usize> = (0..counts.n_genes())
        .into_par_iter()
        .filter(|&row| {
            let n_detected = counts
                .row_dense(row)
                .iter()
                .filter(|&&v| v >= min_count)
                .count();
            n_detected >= min_samples
        })
        .collect();

    if keep_indices.is_empty() {
        return Err(ExprError::EmptyData(format!(
            "No genes have >= {} reads in >= {} samples",
            min_count, min_samples
        )));
    }

    let filtered = counts.subset_genes(&keep_indices)?;
    let result = FilterResult::new(counts.n_genes(), filtered.n_genes());
    log::info!(
        "Min-samples filter (>= {} reads in >= {} samples): kept {} of {} genes",
        min_count,
        min_samples,
        result.n_after,
        result.n_before
    );
    Ok((filtered, result))
}
