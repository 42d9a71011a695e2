//! Error types for the rnaseq-expr library.

use thiserror::Error;

/// Main error type for the library.
///
/// Normalization failures are data-quality problems, not transient faults:
/// they are detected before any partial output is produced and are never
/// retried.
#[derive(Error, Debug)]
pub enum ExprError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid count value '{value}' at row {row}, column {col}")]
    InvalidCount {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Sample ID mismatch: {0}")]
    SampleMismatch(String),

    #[error(
        "Gene identifiers diverge at position {position}: count matrix has '{counts_id}', \
         length table has '{lengths_id}'"
    )]
    GeneAlignment {
        position: usize,
        counts_id: String,
        lengths_id: String,
    },

    #[error("Invalid length {length} for gene '{gene_id}': lengths must be positive and finite")]
    InvalidLength { gene_id: String, length: f64 },

    #[error("Sample '{sample_id}' has no reads after length scaling, cannot normalize")]
    EmptyLibrary { sample_id: String },

    #[error("No samples matched level '{level}' of metadata column '{column}'")]
    EmptyGroup { column: String, level: String },

    #[error("Missing column '{0}' in metadata")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, ExprError>;
