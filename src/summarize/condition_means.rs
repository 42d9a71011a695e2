//! Per-condition mean expression.
//!
//! Collapses a TPM matrix to one column per condition by averaging the
//! samples carrying each label, for scatter comparisons between conditions.

use crate::data::Metadata;
use crate::error::{ExprError, Result};
use crate::normalize::tpm::TpmMatrix;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Mean TPM per condition (genes × conditions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionMeans {
    /// Mean expression (genes × conditions).
    #[serde(skip)]
    pub data: DMatrix<f64>,
    /// Gene identifiers.
    pub gene_ids: Vec<String>,
    /// Condition labels, one per column, sorted.
    pub conditions: Vec<String>,
    /// Number of samples averaged into each column.
    pub n_samples: Vec<usize>,
}

impl ConditionMeans {
    /// Get the mean value for a gene and condition.
    pub fn get(&self, gene: usize, condition: usize) -> f64 {
        self.data[(gene, condition)]
    }

    /// Number of genes.
    pub fn n_genes(&self) -> usize {
        self.data.nrows()
    }

    /// Number of conditions.
    pub fn n_conditions(&self) -> usize {
        self.data.ncols()
    }

    /// Column index of a condition label.
    pub fn condition_index(&self, condition: &str) -> Option<usize> {
        self.conditions.iter().position(|c| c == condition)
    }

    /// Write the table to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "gene_id")?;
        for condition in &self.conditions {
            write!(writer, "\t{}", condition)?;
        }
        writeln!(writer)?;

        for (row_idx, gene_id) in self.gene_ids.iter().enumerate() {
            write!(writer, "{}", gene_id)?;
            for col_idx in 0..self.n_conditions() {
                write!(writer, "\t{}", self.data[(row_idx, col_idx)])?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }
}

/// Average TPM across the samples of each level observed in a metadata
/// column.
///
/// Samples whose value in `column` is missing are left out of every group.
/// Every sample in the TPM matrix must exist in the metadata; grouping joins
/// on the sample identifier.
pub fn condition_means(
    tpm: &TpmMatrix,
    metadata: &Metadata,
    column: &str,
) -> Result<ConditionMeans> {
    let groups = metadata.group_indices(column, &tpm.sample_ids)?;
    if groups.is_empty() {
        return Err(ExprError::EmptyData(format!(
            "Column '{}' has no non-missing levels",
            column
        )));
    }
    means_for_groups(tpm, column, groups)
}

/// Average TPM for an explicit list of condition levels.
///
/// Unlike [`condition_means`], a requested level that matches no sample is a
/// hard [`ExprError::EmptyGroup`] — a renamed label must fail loudly, not
/// produce a silent zero column.
pub fn condition_means_for(
    tpm: &TpmMatrix,
    metadata: &Metadata,
    column: &str,
    levels: &[String],
) -> Result<ConditionMeans> {
    if levels.is_empty() {
        return Err(ExprError::InvalidParameter(
            "No condition levels requested".to_string(),
        ));
    }

    let observed = metadata.group_indices(column, &tpm.sample_ids)?;
    let mut groups = Vec::with_capacity(levels.len());
    for level in levels {
        match observed.iter().find(|(l, _)| l == level) {
            Some((l, indices)) if !indices.is_empty() => {
                groups.push((l.clone(), indices.clone()));
            }
            _ => {
                return Err(ExprError::EmptyGroup {
                    column: column.to_string(),
                    level: level.clone(),
                });
            }
        }
    }
    means_for_groups(tpm, column, groups)
}

fn means_for_groups(
    tpm: &TpmMatrix,
    column: &str,
    groups: Vec<(String, Vec<usize>)>,
) -> Result<ConditionMeans> {
    let n_genes = tpm.n_genes();
    let n_conditions = groups.len();

    let mut data = DMatrix::zeros(n_genes, n_conditions);
    let mut conditions = Vec::with_capacity(n_conditions);
    let mut n_samples = Vec::with_capacity(n_conditions);

    for (col, (level, indices)) in groups.iter().enumerate() {
        // group_indices never yields an empty level, and condition_means_for
        // checks requested levels explicitly; guard anyway.
        if indices.is_empty() {
            return Err(ExprError::EmptyGroup {
                column: column.to_string(),
                level: level.clone(),
            });
        }
        let n = indices.len() as f64;
        for gene in 0..n_genes {
            let sum: f64 = indices.iter().map(|&j| tpm.get(gene, j)).sum();
            data[(gene, col)] = sum / n;
        }
        conditions.push(level.clone());
        n_samples.push(indices.len());
    }

    log::info!(
        "Averaged {} samples into {} condition(s) by '{}'",
        n_samples.iter().sum::<usize>(),
        n_conditions,
        column
    );

    Ok(ConditionMeans {
        data,
        gene_ids: tpm.gene_ids.clone(),
        conditions,
        n_samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CountMatrix, GeneLengthTable};
    use crate::normalize::tpm::norm_tpm;
    use approx::assert_relative_eq;
    use sprs::TriMat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn test_tpm() -> TpmMatrix {
        // 2 genes × 4 samples, lengths 1kb each so TPM is depth-only.
        let mut tri_mat = TriMat::new((2, 4));
        tri_mat.add_triplet(0, 0, 30);
        tri_mat.add_triplet(1, 0, 10);
        tri_mat.add_triplet(0, 1, 60);
        tri_mat.add_triplet(1, 1, 20);
        tri_mat.add_triplet(0, 2, 10);
        tri_mat.add_triplet(1, 2, 30);
        tri_mat.add_triplet(0, 3, 20);
        tri_mat.add_triplet(1, 3, 60);
        let counts = CountMatrix::new(
            tri_mat.to_csr(),
            ids(&["g1", "g2"]),
            ids(&["S1", "S2", "S3", "S4"]),
        )
        .unwrap();
        let lengths = GeneLengthTable::new(ids(&["g1", "g2"]), vec![1.0, 1.0]).unwrap();
        norm_tpm(&counts, &lengths).unwrap()
    }

    fn test_metadata() -> Metadata {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tcondition").unwrap();
        writeln!(file, "S1\tcontrol").unwrap();
        writeln!(file, "S2\tcontrol").unwrap();
        writeln!(file, "S3\ttreated").unwrap();
        writeln!(file, "S4\ttreated").unwrap();
        file.flush().unwrap();
        Metadata::from_tsv(file.path()).unwrap()
    }

    #[test]
    fn test_condition_means() {
        let tpm = test_tpm();
        let meta = test_metadata();
        let means = condition_means(&tpm, &meta, "condition").unwrap();

        assert_eq!(means.conditions, vec!["control", "treated"]);
        assert_eq!(means.n_samples, vec![2, 2]);

        // Both control samples are 75%/25%, both treated are 25%/75%.
        assert_relative_eq!(means.get(0, 0), 750_000.0, max_relative = 1e-9);
        assert_relative_eq!(means.get(1, 0), 250_000.0, max_relative = 1e-9);
        assert_relative_eq!(means.get(0, 1), 250_000.0, max_relative = 1e-9);
        assert_relative_eq!(means.get(1, 1), 750_000.0, max_relative = 1e-9);
    }

    #[test]
    fn test_condition_means_missing_column() {
        let tpm = test_tpm();
        let meta = test_metadata();
        let result = condition_means(&tpm, &meta, "genotype");
        assert!(matches!(result, Err(ExprError::MissingColumn(_))));
    }

    #[test]
    fn test_condition_means_for_known_levels() {
        let tpm = test_tpm();
        let meta = test_metadata();
        let means =
            condition_means_for(&tpm, &meta, "condition", &ids(&["treated", "control"])).unwrap();
        // Requested order is preserved.
        assert_eq!(means.conditions, vec!["treated", "control"]);
        assert_relative_eq!(means.get(0, 0), 250_000.0, max_relative = 1e-9);
    }

    #[test]
    fn test_condition_means_for_unmatched_level() {
        // A renamed label must fail with the offending level, not average
        // nothing.
        let tpm = test_tpm();
        let meta = test_metadata();
        let result = condition_means_for(&tpm, &meta, "condition", &ids(&["Control"]));
        assert!(matches!(
            result,
            Err(ExprError::EmptyGroup { ref level, .. }) if level == "Control"
        ));
    }

    #[test]
    fn test_condition_index() {
        let tpm = test_tpm();
        let meta = test_metadata();
        let means = condition_means(&tpm, &meta, "condition").unwrap();
        assert_eq!(means.condition_index("treated"), Some(1));
        assert_eq!(means.condition_index("missing"), None);
    }

    #[test]
    fn test_to_tsv() {
        let tpm = test_tpm();
        let meta = test_metadata();
        let means = condition_means(&tpm, &meta, "condition").unwrap();

        let file = NamedTempFile::new().unwrap();
        means.to_tsv(file.path()).unwrap();
        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.starts_with("gene_id\tcontrol\ttreated\n"));
    }
}
