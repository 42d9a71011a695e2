//! Transcripts Per Million (TPM) normalization.
//!
//! TPM first scales each count by the gene's transcript length in kilobases
//! (reads per kilobase, RPK), then scales each sample so that its RPK values
//! sum to one million. Unlike CPM, this makes expression comparable across
//! genes of different lengths as well as across sequencing depths.

use crate::data::{CountMatrix, GeneLengthTable};
use crate::error::{ExprError, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Reads-per-kilobase matrix, the length-scaled intermediate of TPM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpkMatrix {
    /// Length-scaled counts (genes × samples).
    #[serde(skip)]
    pub data: DMatrix<f64>,
    /// Gene identifiers.
    pub gene_ids: Vec<String>,
    /// Sample identifiers.
    pub sample_ids: Vec<String>,
}

impl RpkMatrix {
    /// Get the RPK value for a gene and sample.
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
}

/// Result of TPM normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TpmMatrix {
    /// The normalized data (genes × samples). Columns sum to 1e6.
    #[serde(skip)]
    pub data: DMatrix<f64>,
    /// Gene identifiers.
    pub gene_ids: Vec<String>,
    /// Sample identifiers.
    pub sample_ids: Vec<String>,
    /// Per-sample scaling factors (total RPK / 1e6).
    pub scaling_factors: Vec<f64>,
    /// Library sizes (total raw counts per sample).
    pub library_sizes: Vec<u64>,
}

impl TpmMatrix {
    /// Get the TPM value for a gene and sample.
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

    /// Write the TPM matrix to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "gene_id")?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        writeln!(writer)?;

        for (row_idx, gene_id) in self.gene_ids.iter().enumerate() {
            write!(writer, "{}", gene_id)?;
            for col_idx in 0..self.n_samples() {
                write!(writer, "\t{}", self.data[(row_idx, col_idx)])?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }
}

/// Compute the reads-per-kilobase matrix: `RPK[g,s] = counts[g,s] / length_kb[g]`.
///
/// The length table's gene sequence must match the count matrix exactly
/// (same genes, same order); any divergence is a [`ExprError::GeneAlignment`]
/// error. Lengths are guaranteed positive by [`GeneLengthTable`]
/// construction, so no division here can produce infinity.
pub fn norm_rpk(counts: &CountMatrix, lengths: &GeneLengthTable) -> Result<RpkMatrix> {
    let n_genes = counts.n_genes();
    let n_samples = counts.n_samples();

    if n_genes == 0 || n_samples == 0 {
        return Err(ExprError::EmptyData(
            "Cannot compute RPK for an empty matrix".to_string(),
        ));
    }

    let lengths_kb = lengths.align_to(counts.gene_ids())?;

    let rpk_cols: Vec<Vec<f64>> = (0..n_samples)
        .into_par_iter()
        .map(|j| {
            (0..n_genes)
                .map(|i| counts.get(i, j) as f64 / lengths_kb[i])
                .collect()
        })
        .collect();

    let mut data = DMatrix::zeros(n_genes, n_samples);
    for (j, col) in rpk_cols.iter().enumerate() {
        for (i, &val) in col.iter().enumerate() {
            data[(i, j)] = val;
        }
    }

    Ok(RpkMatrix {
        data,
        gene_ids: counts.gene_ids().to_vec(),
        sample_ids: counts.sample_ids().to_vec(),
    })
}

/// Apply TPM normalization to a count matrix.
///
/// # Formula
/// For gene i and sample j, with transcript lengths in kilobases:
///
/// ```text
/// RPK[i,j]  = counts[i,j] / length_kb[i]
/// scale[j]  = sum_i(RPK[i,j]) / 1e6
/// TPM[i,j]  = RPK[i,j] / scale[j]
/// ```
///
/// Each output column sums to 1,000,000 (up to floating-point error), and a
/// cell is zero exactly when its raw count is zero. Per-column gene sums run
/// in input order, so identical inputs reproduce bit-identical output.
///
/// # Errors
/// - [`ExprError::GeneAlignment`] if the length table's gene sequence
///   diverges from the count matrix (checked before any arithmetic).
/// - [`ExprError::EmptyLibrary`] if any sample's total RPK is zero. All
///   samples are checked before the matrix is built; no NaN column can
///   escape into downstream log or distance steps.
pub fn norm_tpm(counts: &CountMatrix, lengths: &GeneLengthTable) -> Result<TpmMatrix> {
    let rpk = norm_rpk(counts, lengths)?;
    let n_genes = rpk.n_genes();
    let n_samples = rpk.n_samples();

    // Per-sample scaling factors, summed in gene order.
    let scaling_factors: Vec<f64> = (0..n_samples)
        .map(|j| {
            let total: f64 = (0..n_genes).map(|i| rpk.data[(i, j)]).sum();
            total / 1_000_000.0
        })
        .collect();

    for (j, &scale) in scaling_factors.iter().enumerate() {
        if scale == 0.0 {
            return Err(ExprError::EmptyLibrary {
                sample_id: counts.sample_ids()[j].clone(),
            });
        }
    }

    let tpm_cols: Vec<Vec<f64>> = (0..n_samples)
        .into_par_iter()
        .map(|j| {
            let scale = scaling_factors[j];
            (0..n_genes).map(|i| rpk.data[(i, j)] / scale).collect()
        })
        .collect();

    let mut data = DMatrix::zeros(n_genes, n_samples);
    for (j, col) in tpm_cols.iter().enumerate() {
        for (i, &val) in col.iter().enumerate() {
            data[(i, j)] = val;
        }
    }

    Ok(TpmMatrix {
        data,
        gene_ids: rpk.gene_ids,
        sample_ids: rpk.sample_ids,
        scaling_factors,
        library_sizes: counts.col_sums(),
    })
}
