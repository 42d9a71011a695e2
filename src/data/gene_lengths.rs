//! Effective transcript lengths used for length normalization.

use crate::error::{ExprError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Per-gene effective transcript lengths, in kilobases.
///
/// The table keeps its own gene order; [`GeneLengthTable::align_to`] verifies
/// that order against a count matrix before any normalization uses the
/// lengths. Trusting positional correspondence without that check is the
/// classic way to normalize against the wrong lengths.
#[derive(Debug, Clone)]
pub struct GeneLengthTable {
    gene_ids: Vec<String>,
    /// Lengths in kilobases, parallel to `gene_ids`.
    lengths_kb: Vec<f64>,
    index: HashMap<String, usize>,
}

impl GeneLengthTable {
    /// Create a table from gene identifiers and lengths in kilobases.
    ///
    /// Rejects non-positive or non-finite lengths and duplicate gene IDs.
    pub fn new(gene_ids: Vec<String>, lengths_kb: Vec<f64>) -> Result<Self> {
        if gene_ids.len() != lengths_kb.len() {
            return Err(ExprError::DimensionMismatch {
                expected: gene_ids.len(),
                actual: lengths_kb.len(),
            });
        }
        if gene_ids.is_empty() {
            return Err(ExprError::EmptyData("No genes in length table".to_string()));
        }

        for (gene_id, &length) in gene_ids.iter().zip(&lengths_kb) {
            if !(length.is_finite() && length > 0.0) {
                return Err(ExprError::InvalidLength {
                    gene_id: gene_id.clone(),
                    length,
                });
            }
        }

        let mut index = HashMap::with_capacity(gene_ids.len());
        for (i, gene_id) in gene_ids.iter().enumerate() {
            if index.insert(gene_id.clone(), i).is_some() {
                return Err(ExprError::InvalidParameter(format!(
                    "Duplicate gene ID '{}' in length table",
                    gene_id
                )));
            }
        }

        Ok(Self {
            gene_ids,
            lengths_kb,
            index,
        })
    }

    /// Create a table from lengths given in base pairs.
    pub fn from_basepairs(gene_ids: Vec<String>, lengths_bp: Vec<f64>) -> Result<Self> {
        let lengths_kb = lengths_bp.into_iter().map(|l| l / 1000.0).collect();
        Self::new(gene_ids, lengths_kb)
    }

    /// Create a table, dropping entries with invalid lengths instead of
    /// failing. Returns the table and the dropped `(gene_id, length)` pairs
    /// so the caller can report them.
    ///
    /// Duplicate gene IDs are still an error.
    pub fn new_dropping_invalid(
        gene_ids: Vec<String>,
        lengths_kb: Vec<f64>,
    ) -> Result<(Self, Vec<(String, f64)>)> {
        if gene_ids.len() != lengths_kb.len() {
            return Err(ExprError::DimensionMismatch {
                expected: gene_ids.len(),
                actual: lengths_kb.len(),
            });
        }

        let mut kept_ids = Vec::with_capacity(gene_ids.len());
        let mut kept_lengths = Vec::with_capacity(lengths_kb.len());
        let mut dropped = Vec::new();

        for (gene_id, length) in gene_ids.into_iter().zip(lengths_kb) {
            if length.is_finite() && length > 0.0 {
                kept_ids.push(gene_id);
                kept_lengths.push(length);
            } else {
                dropped.push((gene_id, length));
            }
        }

        if !dropped.is_empty() {
            log::warn!(
                "Dropped {} gene(s) with non-positive or non-finite lengths",
                dropped.len()
            );
        }

        let table = Self::new(kept_ids, kept_lengths)?;
        Ok((table, dropped))
    }

    /// Load a length table from a TSV file.
    ///
    /// Expected format:
    /// - First row: header (`gene_id<TAB>length_kb`)
    /// - Subsequent rows: gene ID followed by the length in kilobases
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        lines
            .next()
            .ok_or_else(|| ExprError::EmptyData("Empty length table file".to_string()))??;

        let mut gene_ids = Vec::new();
        let mut lengths_kb = Vec::new();

        for (row_idx, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 {
                return Err(ExprError::EmptyData(format!(
                    "Length table row {} has no length column",
                    row_idx
                )));
            }
            let gene_id = fields[0].to_string();
            let length: f64 = fields[1].trim().parse().map_err(|_| ExprError::InvalidLength {
                gene_id: gene_id.clone(),
                length: f64::NAN,
            })?;
            gene_ids.push(gene_id);
            lengths_kb.push(length);
        }

        Self::new(gene_ids, lengths_kb)
    }

    /// Number of genes in the table.
    pub fn len(&self) -> usize {
        self.gene_ids.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.gene_ids.is_empty()
    }

    /// Gene identifiers in table order.
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Lengths in kilobases, in table order.
    pub fn lengths_kb(&self) -> &[f64] {
        &self.lengths_kb
    }

    /// Look up the length in kilobases for a gene.
    pub fn get(&self, gene_id: &str) -> Option<f64> {
        self.index.get(gene_id).map(|&i| self.lengths_kb[i])
    }

    /// Verify that this table's gene sequence matches `gene_ids` exactly and
    /// return the lengths in that order.
    ///
    /// Both the set and the order must match; the first divergence is
    /// reported with both identifiers so mismatched inputs are caught before
    /// any arithmetic, not after.
    pub fn align_to(&self, gene_ids: &[String]) -> Result<&[f64]> {
        if gene_ids.len() != self.gene_ids.len() {
            return Err(ExprError::DimensionMismatch {
                expected: gene_ids.len(),
                actual: self.gene_ids.len(),
            });
        }
        for (position, (counts_id, lengths_id)) in
            gene_ids.iter().zip(&self.gene_ids).enumerate()
        {
            if counts_id != lengths_id {
                return Err(ExprError::GeneAlignment {
                    position,
                    counts_id: counts_id.clone(),
                    lengths_id: lengths_id.clone(),
                });
            }
        }
        Ok(&self.lengths_kb)
    }

    /// Subset the table to the given genes (by ID), preserving the requested
    /// order. Unknown IDs are an error.
    pub fn subset(&self, gene_ids: &[String]) -> Result<Self> {
        let mut lengths = Vec::with_capacity(gene_ids.len());
        for gene_id in gene_ids {
            match self.get(gene_id) {
                Some(length) => lengths.push(length),
                None => {
                    return Err(ExprError::InvalidParameter(format!(
                        "Gene '{}' not present in length table",
                        gene_id
                    )))
                }
            }
        }
        Self::new(gene_ids.to_vec(), lengths)
    }
}
