//! Data structures for expression normalization.

mod count_matrix;
mod gene_lengths;
mod metadata;

pub use count_matrix::CountMatrix;
pub use gene_lengths::GeneLengthTable;
pub use metadata::{Metadata, Variable, VariableType};
