//! Expression normalization.
//!
//! - **TPM**: transcripts per million, length- and depth-normalized
//! - **RPK**: reads per kilobase, the length-scaled intermediate
//! - **log2**: `log2(TPM + c)` for distance, heatmap, and PCA consumption

pub mod log2;
pub mod tpm;

pub use log2::{log2_transform, Log2Matrix};
pub use tpm::{norm_rpk, norm_tpm, RpkMatrix, TpmMatrix};
