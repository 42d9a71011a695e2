//! Sample metadata: condition labels and other per-sample variables.

use crate::error::{ExprError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A variable value attached to a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Categorical variable with string levels (condition, library type, batch).
    Categorical(String),
    /// Continuous numeric covariate.
    Continuous(f64),
    /// Missing value.
    Missing,
}

impl Variable {
    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Variable::Missing)
    }

    /// Try to get as categorical string.
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Variable::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as continuous f64.
    pub fn as_continuous(&self) -> Option<f64> {
        match self {
            Variable::Continuous(v) => Some(*v),
            _ => None,
        }
    }
}

/// Type hint for columns when loading metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Categorical,
    Continuous,
}

/// Per-sample metadata table.
///
/// Grouping for condition averages joins on the sample identifier — never on
/// substring matches against sample names, which silently match nothing once
/// labels are renamed.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// Sample IDs in order.
    sample_ids: Vec<String>,
    /// Column names.
    column_names: Vec<String>,
    /// Data stored as sample_id -> column_name -> Variable.
    data: HashMap<String, HashMap<String, Variable>>,
    /// Type of each column.
    column_types: HashMap<String, VariableType>,
}

impl Metadata {
    /// Load metadata from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with column names (first column is the sample ID)
    /// - Subsequent rows: sample ID followed by variable values
    ///
    /// Columns where every value parses as a number are inferred as
    /// continuous; everything else is categorical. `NA` and empty fields are
    /// missing.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| ExprError::EmptyData("Empty metadata file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(ExprError::EmptyData(
                "Metadata must have at least one variable column".to_string(),
            ));
        }
        let column_names: Vec<String> = header[1..].iter().map(|s| s.to_string()).collect();

        let mut raw_data: Vec<(String, Vec<String>)> = Vec::new();
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let sample_id = fields[0].to_string();
            let values: Vec<String> = fields[1..].iter().map(|s| s.to_string()).collect();
            raw_data.push((sample_id, values));
        }

        if raw_data.is_empty() {
            return Err(ExprError::EmptyData("No samples in metadata".to_string()));
        }

        // Infer column types
        let mut column_types = HashMap::new();
        for (col_idx, col_name) in column_names.iter().enumerate() {
            let all_numeric = raw_data.iter().all(|(_, values)| {
                if col_idx >= values.len() {
                    return true;
                }
                let v = values[col_idx].trim();
                v.is_empty() || v.eq_ignore_ascii_case("na") || v.parse::<f64>().is_ok()
            });
            let var_type = if all_numeric {
                VariableType::Continuous
            } else {
                VariableType::Categorical
            };
            column_types.insert(col_name.clone(), var_type);
        }

        let mut sample_ids = Vec::new();
        let mut data = HashMap::new();

        for (sample_id, values) in raw_data {
            sample_ids.push(sample_id.clone());
            let mut sample_data = HashMap::new();

            for (col_idx, col_name) in column_names.iter().enumerate() {
                let var = if col_idx >= values.len() {
                    Variable::Missing
                } else {
                    let raw = values[col_idx].trim();
                    if raw.is_empty() || raw.eq_ignore_ascii_case("na") {
                        Variable::Missing
                    } else {
                        match column_types.get(col_name) {
                            Some(VariableType::Continuous) => match raw.parse::<f64>() {
                                Ok(v) => Variable::Continuous(v),
                                Err(_) => Variable::Missing,
                            },
                            Some(VariableType::Categorical) | None => {
                                Variable::Categorical(raw.to_string())
                            }
                        }
                    }
                };
                sample_data.insert(col_name.clone(), var);
            }
            data.insert(sample_id, sample_data);
        }

        Ok(Self {
            sample_ids,
            column_names,
            data,
            column_types,
        })
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get a variable value for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Variable> {
        self.data.get(sample_id).and_then(|m| m.get(column))
    }

    /// Get all values for a column, in sample order.
    pub fn column(&self, column: &str) -> Result<Vec<&Variable>> {
        if !self.has_column(column) {
            return Err(ExprError::MissingColumn(column.to_string()));
        }
        Ok(self
            .sample_ids
            .iter()
            .map(|sid| {
                self.data
                    .get(sid)
                    .and_then(|m| m.get(column))
                    .unwrap_or(&Variable::Missing)
            })
            .collect())
    }

    /// Get the type of a column.
    pub fn column_type(&self, column: &str) -> Option<VariableType> {
        self.column_types.get(column).copied()
    }

    /// Get the sorted unique levels for a categorical column.
    pub fn levels(&self, column: &str) -> Result<Vec<String>> {
        let values = self.column(column)?;
        let mut levels: Vec<String> = values
            .iter()
            .filter_map(|v| v.as_categorical().map(String::from))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        levels.sort();
        Ok(levels)
    }

    /// Group the sample IDs in `order` by their level in a categorical
    /// column, returning `(level, indices into order)` pairs sorted by level.
    ///
    /// Samples with a missing value in the column belong to no group. A
    /// sample in `order` that is absent from the metadata is an error.
    pub fn group_indices(
        &self,
        column: &str,
        order: &[String],
    ) -> Result<Vec<(String, Vec<usize>)>> {
        if !self.has_column(column) {
            return Err(ExprError::MissingColumn(column.to_string()));
        }

        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, sample_id) in order.iter().enumerate() {
            let sample_data = self.data.get(sample_id).ok_or_else(|| {
                ExprError::SampleMismatch(format!("Sample '{}' not found in metadata", sample_id))
            })?;
            match sample_data.get(column) {
                Some(Variable::Categorical(level)) => {
                    groups.entry(level.clone()).or_default().push(idx);
                }
                Some(Variable::Continuous(_)) => {
                    return Err(ExprError::InvalidParameter(format!(
                        "Column '{}' is continuous, cannot group by it",
                        column
                    )));
                }
                Some(Variable::Missing) | None => {}
            }
        }

        let mut result: Vec<(String, Vec<usize>)> = groups.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(result)
    }

    /// Subset metadata to only the given samples, in the given order.
    pub fn subset_samples(&self, sample_ids: &[String]) -> Result<Self> {
        let mut new_data = HashMap::new();
        let mut new_sample_ids = Vec::new();

        for sid in sample_ids {
            if let Some(sample_data) = self.data.get(sid) {
                new_data.insert(sid.clone(), sample_data.clone());
                new_sample_ids.push(sid.clone());
            } else {
                return Err(ExprError::SampleMismatch(format!(
                    "Sample '{}' not found in metadata",
                    sid
                )));
            }
        }

        Ok(Self {
            sample_ids: new_sample_ids,
            column_names: self.column_names.clone(),
            data: new_data,
            column_types: self.column_types.clone(),
        })
    }

    /// Align metadata to match the sample order of a count matrix.
    pub fn align_to(&self, sample_ids: &[String]) -> Result<Self> {
        self.subset_samples(sample_ids)
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.data.contains_key(sample_id)
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_tsv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tcondition\tlibrary_type\trin").unwrap();
        writeln!(file, "S1\tcontrol\tpaired\t8.1").unwrap();
        writeln!(file, "S2\ttreated\tpaired\t7.9").unwrap();
        writeln!(file, "S3\tcontrol\tsingle\t9.0").unwrap();
        writeln!(file, "S4\ttreated\tsingle\t8.5").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_metadata() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        assert_eq!(meta.n_samples(), 4);
        assert_eq!(meta.sample_ids(), &["S1", "S2", "S3", "S4"]);
        assert_eq!(meta.column_names(), &["condition", "library_type", "rin"]);
    }

    #[test]
    fn test_get_value() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        let val = meta.get("S1", "condition").unwrap();
        assert_eq!(val.as_categorical(), Some("control"));

        let val = meta.get("S2", "rin").unwrap();
        assert_eq!(val.as_continuous(), Some(7.9));
    }

    #[test]
    fn test_column_type_inference() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        assert_eq!(
            meta.column_type("condition"),
            Some(VariableType::Categorical)
        );
        assert_eq!(meta.column_type("rin"), Some(VariableType::Continuous));
    }

    #[test]
    fn test_levels() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        let levels = meta.levels("condition").unwrap();
        assert_eq!(levels, vec!["control", "treated"]);
    }

    #[test]
    fn test_group_indices() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        let order: Vec<String> = ["S1", "S2", "S3", "S4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let groups = meta.group_indices("condition", &order).unwrap();
        assert_eq!(
            groups,
            vec![
                ("control".to_string(), vec![0, 2]),
                ("treated".to_string(), vec![1, 3]),
            ]
        );
    }

    #[test]
    fn test_group_indices_unknown_sample() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        let order = vec!["S1".to_string(), "S99".to_string()];
        let result = meta.group_indices("condition", &order);
        assert!(matches!(result, Err(ExprError::SampleMismatch(_))));
    }

    #[test]
    fn test_group_indices_continuous_column() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        let order = vec!["S1".to_string()];
        let result = meta.group_indices("rin", &order);
        assert!(matches!(result, Err(ExprError::InvalidParameter(_))));
    }

    #[test]
    fn test_subset_samples() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        let subset = meta
            .subset_samples(&["S1".to_string(), "S3".to_string()])
            .unwrap();
        assert_eq!(subset.n_samples(), 2);
        assert_eq!(subset.sample_ids(), &["S1", "S3"]);
    }

    #[test]
    fn test_missing_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tcondition\trin").unwrap();
        writeln!(file, "S1\tcontrol\t8.0").unwrap();
        writeln!(file, "S2\ttreated\tNA").unwrap();
        writeln!(file, "S3\t\t7.5").unwrap();
        file.flush().unwrap();

        let meta = Metadata::from_tsv(file.path()).unwrap();

        assert!(meta.get("S2", "rin").unwrap().is_missing());
        assert!(meta.get("S3", "condition").unwrap().is_missing());
    }

    #[test]
    fn test_missing_grouped_to_no_group() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tcondition").unwrap();
        writeln!(file, "S1\tcontrol").unwrap();
        writeln!(file, "S2\tNA").unwrap();
        file.flush().unwrap();

        let meta = Metadata::from_tsv(file.path()).unwrap();
        let order = vec!["S1".to_string(), "S2".to_string()];
        let groups = meta.group_indices("condition", &order).unwrap();
        assert_eq!(groups, vec![("control".to_string(), vec![0])]);
    }
}
