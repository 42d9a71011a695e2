//! Sequencing-depth profiling for count matrices.
//!
//! Large depth imbalances between samples are the reason depth normalization
//! exists; this profile surfaces them before any normalization runs.

use crate::data::CountMatrix;
use serde::{Deserialize, Serialize};

/// Summary of per-sample sequencing depth (total read counts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthProfile {
    /// Number of samples.
    pub n_samples: usize,
    /// Total counts per sample.
    pub depths: Vec<u64>,
    /// Mean depth.
    pub mean: f64,
    /// Median depth.
    pub median: f64,
    /// Standard deviation of depths.
    pub std_dev: f64,
    /// Minimum depth.
    pub min: u64,
    /// Maximum depth.
    pub max: u64,
    /// Coefficient of variation (std_dev / mean).
    pub cv: f64,
    /// Log2 fold change between deepest and shallowest sample.
    pub log2_fold_range: f64,
    /// Samples with zero reads.
    pub n_empty: usize,
}

impl DepthProfile {
    /// Check if depths vary enough to matter (CV above 0.5).
    pub fn is_highly_variable(&self) -> bool {
        self.cv > 0.5
    }

    /// Check if the depth range exceeds 4-fold.
    pub fn has_large_range(&self) -> bool {
        self.log2_fold_range > 2.0
    }

    /// Indices of samples with depth below a threshold.
    pub fn samples_below(&self, threshold: u64) -> Vec<usize> {
        self.depths
            .iter()
            .enumerate()
            .filter(|(_, &d)| d < threshold)
            .map(|(i, _)| i)
            .collect()
    }
}

impl std::fmt::Display for DepthProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Sequencing Depth Profile")?;
        writeln!(f, "  Samples: {}", self.n_samples)?;
        writeln!(f, "  Mean:    {:.0}", self.mean)?;
        writeln!(f, "  Median:  {:.0}", self.median)?;
        writeln!(f, "  Std Dev: {:.0}", self.std_dev)?;
        writeln!(f, "  Min:     {}", self.min)?;
        writeln!(f, "  Max:     {}", self.max)?;
        writeln!(f, "  CV:      {:.2}", self.cv)?;
        writeln!(f, "  Log2 fold range: {:.2}", self.log2_fold_range)?;
        writeln!(f, "  Empty samples:   {}", self.n_empty)?;
        Ok(())
    }
}

/// Profile the sequencing depth of every sample in a count matrix.
pub fn profile_depth(counts: &CountMatrix) -> DepthProfile {
    let depths = counts.col_sums();
    let n_samples = depths.len();

    if n_samples == 0 {
        return DepthProfile {
            n_samples: 0,
            depths,
            mean: 0.0,
            median: 0.0,
            std_dev: 0.0,
            min: 0,
            max: 0,
            cv: 0.0,
            log2_fold_range: 0.0,
            n_empty: 0,
        };
    }

    let mean = depths.iter().sum::<u64>() as f64 / n_samples as f64;

    let mut sorted = depths.clone();
    sorted.sort_unstable();
    let median = if n_samples % 2 == 0 {
        (sorted[n_samples / 2 - 1] + sorted[n_samples / 2]) as f64 / 2.0
    } else {
        sorted[n_samples / 2] as f64
    };

    let variance = depths
        .iter()
        .map(|&d| {
            let diff = d as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / n_samples as f64;
    let std_dev = variance.sqrt();

    let min = sorted[0];
    let max = sorted[n_samples - 1];
    let cv = if mean > 0.0 { std_dev / mean } else { 0.0 };
    let log2_fold_range = if min > 0 {
        (max as f64 / min as f64).log2()
    } else {
        f64::INFINITY
    };
    let n_empty = depths.iter().filter(|&&d| d == 0).count();

    DepthProfile {
        n_samples,
        depths,
        mean,
        median,
        std_dev,
        min,
        max,
        cv,
        log2_fold_range,
        n_empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sprs::TriMat;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn create_counts(depths: &[u64]) -> CountMatrix {
        let mut tri_mat = TriMat::new((1, depths.len()));
        for (j, &d) in depths.iter().enumerate() {
            if d > 0 {
                tri_mat.add_triplet(0, j, d);
            }
        }
        let sample_ids: Vec<String> = (0..depths.len()).map(|i| format!("s{}", i)).collect();
        CountMatrix::new(tri_mat.to_csr(), ids(&["g1"]), sample_ids).unwrap()
    }

    #[test]
    fn test_profile_basic() {
        let profile = profile_depth(&create_counts(&[100, 200, 300, 400]));

        assert_eq!(profile.n_samples, 4);
        assert_relative_eq!(profile.mean, 250.0);
        assert_relative_eq!(profile.median, 250.0);
        assert_eq!(profile.min, 100);
        assert_eq!(profile.max, 400);
        assert_relative_eq!(profile.log2_fold_range, 2.0);
        assert_eq!(profile.n_empty, 0);
        assert!(!profile.is_highly_variable());
    }

    #[test]
    fn test_profile_empty_sample() {
        let profile = profile_depth(&create_counts(&[100, 0, 300]));
        assert_eq!(profile.n_empty, 1);
        assert!(profile.log2_fold_range.is_infinite());
    }

    #[test]
    fn test_samples_below() {
        let profile = profile_depth(&create_counts(&[100, 200, 300]));
        assert_eq!(profile.samples_below(250), vec![0, 1]);
    }

    #[test]
    fn test_large_range() {
        let profile = profile_depth(&create_counts(&[10, 100]));
        assert!(profile.has_large_range());
    }
}
