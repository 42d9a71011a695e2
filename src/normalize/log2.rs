//! Log2 transformation of normalized expression values.
//!
//! Heatmaps, sample distances, and PCA all work on `log2(TPM + c)` rather
//! than raw TPM; the pseudocount keeps zero counts finite.

use crate::error::{ExprError, Result};
use crate::normalize::tpm::TpmMatrix;
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A log2-transformed expression matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log2Matrix {
    /// The transformed data (genes × samples).
    #[serde(skip)]
    pub data: DMatrix<f64>,
    /// Gene identifiers.
    pub gene_ids: Vec<String>,
    /// Sample identifiers.
    pub sample_ids: Vec<String>,
    /// Pseudocount added before taking logs.
    pub pseudocount: f64,
}

impl Log2Matrix {
    /// Get the transformed value for a gene and sample.
    pub fn get(&self, gene: usize, sample: usize) -> f64 {
        self.data[(gene, sample)]
    }

    /// Number of genes.
    pub fn n_genes(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Get a row (gene) as a vector.
    pub fn row(&self, gene: usize) -> Vec<f64> {
        self.data.row(gene).iter().cloned().collect()
    }

    /// Get a column (sample) as a vector.
    pub fn col(&self, sample: usize) -> Vec<f64> {
        self.data.column(sample).iter().cloned().collect()
    }

    /// Get reference to the underlying matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }
}

/// Compute `log2(TPM + pseudocount)` element-wise.
///
/// The pseudocount must be strictly positive; zero TPM entries would
/// otherwise map to negative infinity and poison every downstream distance.
pub fn log2_transform(tpm: &TpmMatrix, pseudocount: f64) -> Result<Log2Matrix> {
    if !(pseudocount.is_finite() && pseudocount > 0.0) {
        return Err(ExprError::InvalidParameter(
            "Pseudocount must be positive and finite".to_string(),
        ));
    }

    let n_genes = tpm.n_genes();
    let n_samples = tpm.n_samples();
    if n_genes == 0 || n_samples == 0 {
        return Err(ExprError::EmptyData(
            "Cannot log-transform an empty matrix".to_string(),
        ));
    }

    let cols: Vec<Vec<f64>> = (0..n_samples)
        .into_par_iter()
        .map(|j| {
            (0..n_genes)
                .map(|i| (tpm.get(i, j) + pseudocount).log2())
                .collect()
        })
        .collect();

    let mut data = DMatrix::zeros(n_genes, n_samples);
    for (j, col) in cols.iter().enumerate() {
        for (i, &val) in col.iter().enumerate() {
            data[(i, j)] = val;
        }
    }

    Ok(Log2Matrix {
        data,
        gene_ids: tpm.gene_ids.clone(),
        sample_ids: tpm.sample_ids.clone(),
        pseudocount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CountMatrix, GeneLengthTable};
    use crate::normalize::tpm::norm_tpm;
    use approx::assert_relative_eq;
    use sprs::TriMat;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn test_tpm() -> TpmMatrix {
        let mut tri_mat = TriMat::new((2, 2));
        tri_mat.add_triplet(0, 0, 10);
        tri_mat.add_triplet(0, 1, 20);
        tri_mat.add_triplet(1, 1, 5);
        let counts =
            CountMatrix::new(tri_mat.to_csr(), ids(&["g1", "g2"]), ids(&["s1", "s2"])).unwrap();
        let lengths = GeneLengthTable::new(ids(&["g1", "g2"]), vec![1.0, 2.0]).unwrap();
        norm_tpm(&counts, &lengths).unwrap()
    }

    #[test]
    fn test_log2_values() {
        let tpm = test_tpm();
        let log2 = log2_transform(&tpm, 1.0).unwrap();

        assert_relative_eq!(
            log2.get(0, 0),
            (1_000_000.0_f64 + 1.0).log2(),
            max_relative = 1e-12
        );
        // Zero TPM maps to log2(pseudocount) = 0 for pseudocount 1.
        assert_relative_eq!(log2.get(1, 0), 0.0);
        assert_eq!(log2.pseudocount, 1.0);
    }

    #[test]
    fn test_log2_all_finite() {
        let tpm = test_tpm();
        let log2 = log2_transform(&tpm, 0.5).unwrap();
        for i in 0..log2.n_genes() {
            for j in 0..log2.n_samples() {
                assert!(log2.get(i, j).is_finite());
            }
        }
    }

    #[test]
    fn test_log2_invalid_pseudocount() {
        let tpm = test_tpm();
        assert!(log2_transform(&tpm, 0.0).is_err());
        assert!(log2_transform(&tpm, -1.0).is_err());
        assert!(log2_transform(&tpm, f64::NAN).is_err());
    }
}
