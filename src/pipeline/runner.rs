//! Workflow runner composing filtering, normalization, and summarization.

use crate::data::{CountMatrix, GeneLengthTable, Metadata};
use crate::error::{ExprError, Result};
use crate::filter::{filter_min_samples, filter_total_count, FilterResult};
use crate::normalize::{log2_transform, norm_tpm, Log2Matrix, TpmMatrix};
use crate::summarize::{condition_means, ConditionMeans};
use serde::{Deserialize, Serialize};

/// A step in the expression workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkflowStep {
    /// Keep genes whose total count meets a threshold.
    FilterTotalCount { min_total: u64 },
    /// Keep genes with at least `min_count` reads in at least `min_samples`
    /// samples.
    FilterMinSamples { min_count: u64, min_samples: usize },
    /// Length- and depth-normalize to TPM.
    NormalizeTpm,
    /// Transform TPM to `log2(TPM + pseudocount)`.
    Log2Transform { pseudocount: f64 },
    /// Average TPM per level of a metadata column.
    AverageByCondition { column: String },
}

/// Workflow configuration for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Name of the workflow.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Steps to execute.
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(ExprError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(ExprError::from)
    }
}

/// Everything a finished workflow produces.
#[derive(Debug, Clone)]
pub struct WorkflowOutput {
    /// The TPM matrix (always produced; a workflow without a normalize step
    /// is an error).
    pub tpm: TpmMatrix,
    /// Log2-transformed TPM, if requested.
    pub log2: Option<Log2Matrix>,
    /// Per-condition means, if requested.
    pub condition_means: Option<ConditionMeans>,
    /// Reports from each filter step, in order.
    pub filters: Vec<FilterResult>,
}

/// Builder for constructing and running expression workflows.
#[derive(Debug, Clone)]
pub struct Workflow {
    steps: Vec<WorkflowStep>,
    name: String,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    /// Create a new empty workflow.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            name: "unnamed".to_string(),
        }
    }

    /// Create from a config.
    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self {
            steps: config.steps.clone(),
            name: config.name.clone(),
        }
    }

    /// Set the workflow name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Filter genes by total count across samples.
    pub fn filter_total_count(mut self, min_total: u64) -> Self {
        self.steps.push(WorkflowStep::FilterTotalCount { min_total });
        self
    }

    /// Filter genes by detection in a minimum number of samples.
    pub fn filter_min_samples(mut self, min_count: u64, min_samples: usize) -> Self {
        self.steps.push(WorkflowStep::FilterMinSamples {
            min_count,
            min_samples,
        });
        self
    }

    /// Normalize to TPM.
    pub fn normalize_tpm(mut self) -> Self {
        self.steps.push(WorkflowStep::NormalizeTpm);
        self
    }

    /// Transform to `log2(TPM + pseudocount)`.
    pub fn log2_transform(mut self, pseudocount: f64) -> Self {
        self.steps.push(WorkflowStep::Log2Transform { pseudocount });
        self
    }

    /// Average TPM per level of a metadata column.
    pub fn average_by_condition(mut self, column: &str) -> Self {
        self.steps.push(WorkflowStep::AverageByCondition {
            column: column.to_string(),
        });
        self
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> WorkflowConfig {
        WorkflowConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            steps: self.steps.clone(),
        }
    }

    /// Run the workflow.
    ///
    /// The length table may be a superset of the count matrix; before
    /// normalization it is joined to the surviving genes by identifier, so
    /// filtering never relies on positional correspondence.
    pub fn run(
        &self,
        counts: &CountMatrix,
        lengths: &GeneLengthTable,
        metadata: &Metadata,
    ) -> Result<WorkflowOutput> {
        let mut state = WorkflowState::new(counts.clone(), lengths.clone(), metadata.clone());

        log::info!("Running workflow '{}' ({} steps)", self.name, self.steps.len());
        for (i, step) in self.steps.iter().enumerate() {
            state = state.apply(step).map_err(|e| {
                ExprError::Workflow(format!("Step {} ({:?}) failed: {}", i + 1, step, e))
            })?;
        }

        state.finalize(&self.name)
    }
}

struct WorkflowState {
    counts: CountMatrix,
    lengths: GeneLengthTable,
    metadata: Metadata,
    tpm: Option<TpmMatrix>,
    log2: Option<Log2Matrix>,
    means: Option<ConditionMeans>,
    filters: Vec<FilterResult>,
}

impl WorkflowState {
    fn new(counts: CountMatrix, lengths: GeneLengthTable, metadata: Metadata) -> Self {
        Self {
            counts,
            lengths,
            metadata,
            tpm: None,
            log2: None,
            means: None,
            filters: Vec::new(),
        }
    }

    fn apply(mut self, step: &WorkflowStep) -> Result<Self> {
        match step {
            WorkflowStep::FilterTotalCount { min_total } => {
                // Dropping genes after scaling would break the per-column
                // TPM sum; filters only run on raw counts.
                self.require_not_normalized()?;
                let (filtered, result) = filter_total_count(&self.counts, *min_total)?;
                self.counts = filtered;
                self.filters.push(result);
            }
            WorkflowStep::FilterMinSamples {
                min_count,
                min_samples,
            } => {
                self.require_not_normalized()?;
                let (filtered, result) =
                    filter_min_samples(&self.counts, *min_count, *min_samples)?;
                self.counts = filtered;
                self.filters.push(result);
            }
            WorkflowStep::NormalizeTpm => {
                let aligned = self.lengths.subset(self.counts.gene_ids())?;
                self.tpm = Some(norm_tpm(&self.counts, &aligned)?);
                log::info!("Normalized {} genes to TPM", self.counts.n_genes());
            }
            WorkflowStep::Log2Transform { pseudocount } => {
                let tpm = self.require_normalized()?;
                self.log2 = Some(log2_transform(tpm, *pseudocount)?);
            }
            WorkflowStep::AverageByCondition { column } => {
                let tpm = self.require_normalized()?;
                self.means = Some(condition_means(tpm, &self.metadata, column)?);
            }
        }
        Ok(self)
    }

    fn require_not_normalized(&self) -> Result<()> {
        if self.tpm.is_some() {
            return Err(ExprError::InvalidParameter(
                "Gene filters must run before normalization".to_string(),
            ));
        }
        Ok(())
    }

    fn require_normalized(&self) -> Result<&TpmMatrix> {
        self.tpm.as_ref().ok_or_else(|| {
            ExprError::InvalidParameter("This step requires a normalization step first".to_string())
        })
    }

    fn finalize(self, name: &str) -> Result<WorkflowOutput> {
        let tpm = self.tpm.ok_or_else(|| {
            ExprError::Workflow(format!(
                "Workflow '{}' has no normalization step, nothing to return",
                name
            ))
        })?;
        Ok(WorkflowOutput {
            tpm,
            log2: self.log2,
            condition_means: self.means,
            filters: self.filters,
        })
    }
}
