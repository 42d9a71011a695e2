//! Pairwise sample distances on log-scale expression.

use crate::error::{ExprError, Result};
use crate::normalize::log2::Log2Matrix;
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Symmetric matrix of Euclidean distances between samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleDistances {
    /// Distances (samples × samples), zero diagonal.
    #[serde(skip)]
    pub data: DMatrix<f64>,
    /// Sample identifiers.
    pub sample_ids: Vec<String>,
}

impl SampleDistances {
    /// Distance between two samples.
    pub fn get(&self, a: usize, b: usize) -> f64 {
        self.data[(a, b)]
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Write the distance matrix to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "sample_id")?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        writeln!(writer)?;

        for (row_idx, sample_id) in self.sample_ids.iter().enumerate() {
            write!(writer, "{}", sample_id)?;
            for col_idx in 0..self.n_samples() {
                write!(writer, "\t{}", self.data[(row_idx, col_idx)])?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }
}

/// Compute Euclidean distances between all sample pairs of a log2 matrix.
///
/// The distance between samples a and b is
/// `sqrt(sum_g (x[g,a] - x[g,b])^2)` over all genes g.
pub fn sample_distances(log2: &Log2Matrix) -> Result<SampleDistances> {
    let n_samples = log2.n_samples();
    let n_genes = log2.n_genes();
    if n_samples == 0 || n_genes == 0 {
        return Err(ExprError::EmptyData(
            "Cannot compute distances on an empty matrix".to_string(),
        ));
    }

    let rows: Vec<Vec<f64>> = (0..n_samples)
        .into_par_iter()
        .map(|a| {
            (0..n_samples)
                .map(|b| {
                    let sq_sum: f64 = (0..n_genes)
                        .map(|g| {
                            let d = log2.get(g, a) - log2.get(g, b);
                            d * d
                        })
                        .sum();
                    sq_sum.sqrt()
                })
                .collect()
        })
        .collect();

    let mut data = DMatrix::zeros(n_samples, n_samples);
    for (a, row) in rows.iter().enumerate() {
        for (b, &val) in row.iter().enumerate() {
            data[(a, b)] = val;
        }
    }

    Ok(SampleDistances {
        data,
        sample_ids: log2.sample_ids.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn test_log2() -> Log2Matrix {
        // 2 genes × 3 samples; s1 and s2 identical, s3 offset by (3, 4).
        let data = DMatrix::from_row_slice(2, 3, &[1.0, 1.0, 4.0, 2.0, 2.0, 6.0]);
        Log2Matrix {
            data,
            gene_ids: vec!["g1".to_string(), "g2".to_string()],
            sample_ids: vec!["s1".to_string(), "s2".to_string(), "s3".to_string()],
            pseudocount: 1.0,
        }
    }

    #[test]
    fn test_distances() {
        let dist = sample_distances(&test_log2()).unwrap();

        assert_eq!(dist.n_samples(), 3);
        assert_relative_eq!(dist.get(0, 1), 0.0);
        assert_relative_eq!(dist.get(0, 2), 5.0, max_relative = 1e-12);
    }

    #[test]
    fn test_symmetric_zero_diagonal() {
        let dist = sample_distances(&test_log2()).unwrap();
        for a in 0..3 {
            assert_relative_eq!(dist.get(a, a), 0.0);
            for b in 0..3 {
                assert_relative_eq!(dist.get(a, b), dist.get(b, a));
            }
        }
    }
}
