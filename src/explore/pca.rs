//! Principal component analysis of samples.
//!
//! Follows the usual RNA-seq recipe: take the most variable genes on the
//! log2 scale, center them, and project the samples onto the principal
//! components. Only the coordinates and explained-variance fractions are
//! produced; rendering belongs to the caller.

use crate::error::{ExprError, Result};
use crate::normalize::log2::Log2Matrix;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Default number of most-variable genes used for PCA.
pub const DEFAULT_N_TOP_GENES: usize = 500;

/// Per-sample principal-component coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcaResult {
    /// Coordinates (samples × components).
    #[serde(skip)]
    pub coords: DMatrix<f64>,
    /// Fraction of variance explained by each component.
    pub explained: Vec<f64>,
    /// Sample identifiers.
    pub sample_ids: Vec<String>,
    /// Number of genes that entered the decomposition.
    pub n_genes_used: usize,
}

impl PcaResult {
    /// Coordinate of a sample on a component.
    pub fn get(&self, sample: usize, component: usize) -> f64 {
        self.coords[(sample, component)]
    }

    /// Number of components.
    pub fn n_components(&self) -> usize {
        self.coords.ncols()
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.coords.nrows()
    }

    /// Write per-sample coordinates to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "sample_id")?;
        for k in 0..self.n_components() {
            write!(writer, "\tPC{}", k + 1)?;
        }
        writeln!(writer)?;

        for (row_idx, sample_id) in self.sample_ids.iter().enumerate() {
            write!(writer, "{}", sample_id)?;
            for col_idx in 0..self.n_components() {
                write!(writer, "\t{}", self.coords[(row_idx, col_idx)])?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }
}

/// Run PCA on the `n_top_genes` most variable genes of a log2 matrix.
///
/// Genes are ranked by their variance across samples (ties broken by input
/// order, so results are reproducible), centered per gene, and decomposed by
/// SVD. Components are returned in decreasing order of explained variance.
pub fn pca(log2: &Log2Matrix, n_top_genes: usize) -> Result<PcaResult> {
    let n_samples = log2.n_samples();
    let n_genes = log2.n_genes();

    if n_samples < 2 {
        return Err(ExprError::InvalidParameter(
            "PCA requires at least two samples".to_string(),
        ));
    }
    if n_genes == 0 {
        return Err(ExprError::EmptyData("No genes for PCA".to_string()));
    }
    if n_top_genes == 0 {
        return Err(ExprError::InvalidParameter(
            "n_top_genes must be at least 1".to_string(),
        ));
    }

    // Rank genes by variance across samples.
    let variances: Vec<f64> = (0..n_genes)
        .map(|g| {
            let mean: f64 = (0..n_samples).map(|j| log2.get(g, j)).sum::<f64>() / n_samples as f64;
            (0..n_samples)
                .map(|j| {
                    let d = log2.get(g, j) - mean;
                    d * d
                })
                .sum::<f64>()
                / (n_samples - 1) as f64
        })
        .collect();

    let mut order: Vec<usize> = (0..n_genes).collect();
    order.sort_by(|&a, &b| {
        variances[b]
            .partial_cmp(&variances[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    let selected = &order[..n_top_genes.min(n_genes)];

    // Samples × genes, centered per gene.
    let mut x = DMatrix::zeros(n_samples, selected.len());
    for (col, &g) in selected.iter().enumerate() {
        let mean: f64 = (0..n_samples).map(|j| log2.get(g, j)).sum::<f64>() / n_samples as f64;
        for j in 0..n_samples {
            x[(j, col)] = log2.get(g, j) - mean;
        }
    }

    let svd = x.svd(true, false);
    let u = svd
        .u
        .ok_or_else(|| ExprError::Numerical("SVD did not produce U".to_string()))?;
    let singular = svd.singular_values;

    // Order components by singular value; nalgebra does not guarantee it.
    let n_components = singular.len();
    let mut comp_order: Vec<usize> = (0..n_components).collect();
    comp_order.sort_by(|&a, &b| {
        singular[b]
            .partial_cmp(&singular[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let total_var: f64 = singular.iter().map(|s| s * s).sum();
    if total_var == 0.0 {
        return Err(ExprError::Numerical(
            "No variance among samples, PCA is undefined".to_string(),
        ));
    }

    let mut coords = DMatrix::zeros(n_samples, n_components);
    let mut explained = Vec::with_capacity(n_components);
    for (new_k, &k) in comp_order.iter().enumerate() {
        let s = singular[k];
        for j in 0..n_samples {
            coords[(j, new_k)] = u[(j, k)] * s;
        }
        explained.push(s * s / total_var);
    }

    Ok(PcaResult {
        coords,
        explained,
        sample_ids: log2.sample_ids.clone(),
        n_genes_used: selected.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn test_log2() -> Log2Matrix {
        // 3 genes × 4 samples. Two clear sample groups separated on g1/g2;
        // g3 is constant and contributes nothing.
        let data = DMatrix::from_row_slice(
            3,
            4,
            &[
                1.0, 1.2, 5.0, 5.2, //
                2.0, 2.1, 6.0, 6.1, //
                3.0, 3.0, 3.0, 3.0,
            ],
        );
        Log2Matrix {
            data,
            gene_ids: vec!["g1".to_string(), "g2".to_string(), "g3".to_string()],
            sample_ids: vec![
                "c1".to_string(),
                "c2".to_string(),
                "t1".to_string(),
                "t2".to_string(),
            ],
            pseudocount: 1.0,
        }
    }

    #[test]
    fn test_pca_separates_groups() {
        let result = pca(&test_log2(), 500).unwrap();

        assert_eq!(result.n_samples(), 4);
        assert_eq!(result.n_genes_used, 3);

        // PC1 must separate the two groups: c1/c2 on one side, t1/t2 on the
        // other.
        let pc1: Vec<f64> = (0..4).map(|j| result.get(j, 0)).collect();
        assert_eq!(pc1[0].signum(), pc1[1].signum());
        assert_eq!(pc1[2].signum(), pc1[3].signum());
        assert_ne!(pc1[0].signum(), pc1[2].signum());

        // PC1 dominates the variance.
        assert!(result.explained[0] > 0.9);
    }

    #[test]
    fn test_pca_explained_sums_to_one() {
        let result = pca(&test_log2(), 500).unwrap();
        let total: f64 = result.explained.iter().sum();
        assert_relative_eq!(total, 1.0, max_relative = 1e-9);
        // Decreasing order.
        for pair in result.explained.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn test_pca_top_gene_selection() {
        // With only one gene admitted, the constant gene must not be chosen.
        let result = pca(&test_log2(), 1).unwrap();
        assert_eq!(result.n_genes_used, 1);
        assert!(result.explained[0] > 0.99);
    }

    #[test]
    fn test_pca_requires_two_samples() {
        let log2 = Log2Matrix {
            data: DMatrix::from_row_slice(2, 1, &[1.0, 2.0]),
            gene_ids: vec!["g1".to_string(), "g2".to_string()],
            sample_ids: vec!["s1".to_string()],
            pseudocount: 1.0,
        };
        assert!(pca(&log2, 10).is_err());
    }

    #[test]
    fn test_pca_no_variance() {
        let log2 = Log2Matrix {
            data: DMatrix::from_element(2, 3, 1.5),
            gene_ids: vec!["g1".to_string(), "g2".to_string()],
            sample_ids: vec!["s1".to_string(), "s2".to_string(), "s3".to_string()],
            pseudocount: 1.0,
        };
        assert!(matches!(pca(&log2, 10), Err(ExprError::Numerical(_))));
    }

    #[test]
    fn test_pca_deterministic() {
        let a = pca(&test_log2(), 500).unwrap();
        let b = pca(&test_log2(), 500).unwrap();
        assert_eq!(a.coords, b.coords);
        assert_eq!(a.explained, b.explained);
    }
}
