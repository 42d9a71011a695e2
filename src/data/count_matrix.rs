//! Gene-by-sample count matrix with sparse storage.

use crate::error::{ExprError, Result};
use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A sparse matrix of raw read counts.
///
/// Rows are genes, columns are samples. Uses CSR (Compressed Sparse Row)
/// format for efficient row-wise operations; RNA-seq count matrices are
/// typically sparse enough for this to pay off.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    /// Sparse matrix in CSR format (genes × samples)
    data: CsMat<u64>,
    /// Gene identifiers (row names)
    gene_ids: Vec<String>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
}

impl CountMatrix {
    /// Create a new CountMatrix from a sparse matrix and identifiers.
    pub fn new(data: CsMat<u64>, gene_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != gene_ids.len() {
            return Err(ExprError::DimensionMismatch {
                expected: nrows,
                actual: gene_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(ExprError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        Ok(Self {
            data,
            gene_ids,
            sample_ids,
        })
    }

    /// Load a count matrix from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first column is the gene ID header)
    /// - Subsequent rows: gene ID followed by integer counts
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| ExprError::EmptyData("Empty TSV file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(ExprError::EmptyData(
                "TSV must have at least one sample".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header[1..].iter().map(|s| s.to_string()).collect();
        let n_samples = sample_ids.len();

        let mut triplets: Vec<(usize, usize, u64)> = Vec::new();
        let mut gene_ids: Vec<String> = Vec::new();

        for (row_idx, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();

            gene_ids.push(fields[0].to_string());

            for (col_idx, value_str) in fields[1..].iter().enumerate() {
                if col_idx >= n_samples {
                    break;
                }
                let value: u64 = value_str.trim().parse().map_err(|_| ExprError::InvalidCount {
                    value: value_str.to_string(),
                    row: row_idx,
                    col: col_idx,
                })?;
                if value > 0 {
                    triplets.push((gene_ids.len() - 1, col_idx, value));
                }
            }
        }

        let n_genes = gene_ids.len();
        if n_genes == 0 {
            return Err(ExprError::EmptyData("No genes in TSV".to_string()));
        }

        let mut tri_mat = TriMat::new((n_genes, n_samples));
        for (row, col, val) in triplets {
            tri_mat.add_triplet(row, col, val);
        }
        let data: CsMat<u64> = tri_mat.to_csr();

        Self::new(data, gene_ids, sample_ids)
    }

    /// Write the count matrix to a TSV file.
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
                write!(writer, "\t{}", self.get(row_idx, col_idx))?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    /// Get the count at (row, col), returning 0 for entries not stored.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.data.get(row, col).copied().unwrap_or(0)
    }

    /// Number of genes (rows).
    #[inline]
    pub fn n_genes(&self) -> usize {
        self.data.rows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.cols()
    }

    /// Total number of non-zero entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.data.nnz()
    }

    /// Gene identifiers.
    #[inline]
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get the underlying sparse matrix.
    #[inline]
    pub fn data(&self) -> &CsMat<u64> {
        &self.data
    }

    /// Get a dense vector for a specific gene (row).
    pub fn row_dense(&self, row: usize) -> Vec<u64> {
        let mut dense = vec![0u64; self.n_samples()];
        if let Some(row_vec) = self.data.outer_view(row) {
            for (col, &val) in row_vec.iter() {
                dense[col] = val;
            }
        }
        dense
    }

    /// Get a dense vector for a specific sample (column).
    pub fn col_dense(&self, col: usize) -> Vec<u64> {
        (0..self.n_genes()).map(|row| self.get(row, col)).collect()
    }

    /// Compute row sums (total counts per gene).
    pub fn row_sums(&self) -> Vec<u64> {
        (0..self.n_genes())
            .into_par_iter()
            .map(|row| {
                self.data
                    .outer_view(row)
                    .map(|v| v.iter().map(|(_, &val)| val).sum())
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Compute column sums (library sizes per sample).
    pub fn col_sums(&self) -> Vec<u64> {
        let mut sums = vec![0u64; self.n_samples()];
        for row_vec in self.data.outer_iterator() {
            for (col, &val) in row_vec.iter() {
                sums[col] += val;
            }
        }
        sums
    }

    /// Subset the matrix to the given genes (by index), preserving order.
    pub fn subset_genes(&self, indices: &[usize]) -> Result<Self> {
        let n_genes = indices.len();
        let n_samples = self.n_samples();

        let mut triplets = Vec::new();
        let mut new_gene_ids = Vec::with_capacity(n_genes);

        for (new_row, &old_row) in indices.iter().enumerate() {
            if old_row >= self.n_genes() {
                return Err(ExprError::InvalidParameter(format!(
                    "Gene index {} out of bounds",
                    old_row
                )));
            }
            new_gene_ids.push(self.gene_ids[old_row].clone());

            if let Some(row_vec) = self.data.outer_view(old_row) {
                for (col, &val) in row_vec.iter() {
                    triplets.push((new_row, col, val));
                }
            }
        }

        let mut tri_mat = TriMat::new((n_genes, n_samples));
        for (row, col, val) in triplets {
            tri_mat.add_triplet(row, col, val);
        }

        Self::new(tri_mat.to_csr(), new_gene_ids, self.sample_ids.clone())
    }

    /// Subset the matrix to the given samples (by index), preserving order.
    pub fn subset_samples(&self, indices: &[usize]) -> Result<Self> {
        let n_genes = self.n_genes();
        let n_samples = indices.len();

        let col_map: HashMap<usize, usize> = indices
            .iter()
            .enumerate()
            .map(|(new_idx, &old_idx)| (old_idx, new_idx))
            .collect();

        let mut new_sample_ids = Vec::with_capacity(n_samples);
        for &old_col in indices {
            if old_col >= self.n_samples() {
                return Err(ExprError::InvalidParameter(format!(
                    "Sample index {} out of bounds",
                    old_col
                )));
            }
            new_sample_ids.push(self.sample_ids[old_col].clone());
        }

        let mut triplets = Vec::new();
        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            for (old_col, &val) in row_vec.iter() {
                if let Some(&new_col) = col_map.get(&old_col) {
                    triplets.push((row, new_col, val));
                }
            }
        }

        let mut tri_mat = TriMat::new((n_genes, n_samples));
        for (row, col, val) in triplets {
            tri_mat.add_triplet(row, col, val);
        }

        Self::new(tri_mat.to_csr(), self.gene_ids.clone(), new_sample_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_matrix() -> CountMatrix {
        // 3 genes × 4 samples
        let mut tri_mat = TriMat::new((3, 4));
        tri_mat.add_triplet(0, 0, 10);
        tri_mat.add_triplet(0, 1, 20);
        tri_mat.add_triplet(0, 3, 5);
        tri_mat.add_triplet(1, 0, 100);
        tri_mat.add_triplet(1, 1, 200);
        tri_mat.add_triplet(1, 2, 150);
        tri_mat.add_triplet(1, 3, 175);
        tri_mat.add_triplet(2, 0, 1);
        // gene 2 is only detected in sample 0

        let gene_ids = vec![
            "gene_A".to_string(),
            "gene_B".to_string(),
            "gene_C".to_string(),
        ];
        let sample_ids = vec![
            "sample1".to_string(),
            "sample2".to_string(),
            "sample3".to_string(),
            "sample4".to_string(),
        ];

        CountMatrix::new(tri_mat.to_csr(), gene_ids, sample_ids).unwrap()
    }

    #[test]
    fn test_dimensions() {
        let mat = create_test_matrix();
        assert_eq!(mat.n_genes(), 3);
        assert_eq!(mat.n_samples(), 4);
    }

    #[test]
    fn test_get_values() {
        let mat = create_test_matrix();
        assert_eq!(mat.get(0, 0), 10);
        assert_eq!(mat.get(0, 2), 0);
        assert_eq!(mat.get(2, 0), 1);
        assert_eq!(mat.get(2, 1), 0);
    }

    #[test]
    fn test_row_dense() {
        let mat = create_test_matrix();
        assert_eq!(mat.row_dense(0), vec![10, 20, 0, 5]);
    }

    #[test]
    fn test_col_sums() {
        let mat = create_test_matrix();
        assert_eq!(mat.col_sums(), vec![111, 220, 150, 180]);
    }

    #[test]
    fn test_row_sums() {
        let mat = create_test_matrix();
        assert_eq!(mat.row_sums(), vec![35, 625, 1]);
    }

    #[test]
    fn test_mismatched_ids_rejected() {
        let tri_mat: TriMat<u64> = TriMat::new((2, 2));
        let result = CountMatrix::new(
            tri_mat.to_csr(),
            vec!["g1".to_string()],
            vec!["s1".to_string(), "s2".to_string()],
        );
        assert!(matches!(result, Err(ExprError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_tsv_roundtrip() {
        let mat = create_test_matrix();

        let temp_file = NamedTempFile::new().unwrap();
        mat.to_tsv(temp_file.path()).unwrap();

        let loaded = CountMatrix::from_tsv(temp_file.path()).unwrap();
        assert_eq!(loaded.n_genes(), mat.n_genes());
        assert_eq!(loaded.n_samples(), mat.n_samples());
        assert_eq!(loaded.gene_ids(), mat.gene_ids());
        assert_eq!(loaded.sample_ids(), mat.sample_ids());

        for row in 0..mat.n_genes() {
            for col in 0..mat.n_samples() {
                assert_eq!(loaded.get(row, col), mat.get(row, col));
            }
        }
    }

    #[test]
    fn test_from_tsv_rejects_bad_count() {
        let mut file = NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(file, "gene_id\ts1\ts2").unwrap();
        writeln!(file, "g1\t10\tnot_a_number").unwrap();
        file.flush().unwrap();

        let result = CountMatrix::from_tsv(file.path());
        assert!(matches!(result, Err(ExprError::InvalidCount { .. })));
    }

    #[test]
    fn test_subset_genes() {
        let mat = create_test_matrix();
        let subset = mat.subset_genes(&[0, 2]).unwrap();

        assert_eq!(subset.n_genes(), 2);
        assert_eq!(subset.n_samples(), 4);
        assert_eq!(subset.gene_ids(), &["gene_A", "gene_C"]);
        assert_eq!(subset.get(0, 0), 10);
        assert_eq!(subset.get(1, 0), 1);
    }

    #[test]
    fn test_subset_samples() {
        let mat = create_test_matrix();
        let subset = mat.subset_samples(&[1, 3]).unwrap();

        assert_eq!(subset.n_genes(), 3);
        assert_eq!(subset.n_samples(), 2);
        assert_eq!(subset.sample_ids(), &["sample2", "sample4"]);
        assert_eq!(subset.get(0, 0), 20);
        assert_eq!(subset.get(0, 1), 5);
    }
}
