//! Workflow composition and execution.

mod runner;

pub use runner::{Workflow, WorkflowConfig, WorkflowOutput, WorkflowStep};
