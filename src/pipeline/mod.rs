//! Pipeline composition and execution for missing-value workflows.

mod runner;

pub use runner::{run_standard, Pipeline, PipelineConfig, PipelineOutput, PipelineStep};
