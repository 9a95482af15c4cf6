//! Pipeline runner for composing and executing imputation steps.

use crate::combine::{combine_with, CombineConfig, CompletedMatrix, Selection};
use crate::data::{AbundanceMatrix, ImputationEnsemble};
use crate::error::{ImputeError, Result};
use crate::filter::{filter_by_threshold_with_stats, FilterResult};
use crate::impute::{impute_with_config, ImputeConfig, ImputeMethod};
use crate::profile::{compute_missingness, MissingnessVector};
use crate::test::{mcar_test, McarResult};
use serde::{Deserialize, Serialize};

/// A step in the imputation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineStep {
    /// Drop proteins whose missingness exceeds the threshold.
    FilterMissingness { threshold: f64 },
    /// Little's MCAR test; failures are recorded, not fatal.
    TestMcar,
    /// Chained-equations multiple imputation.
    Impute { config: ImputeConfig },
    /// Select or pool members, then normalize.
    Combine {
        selection: Selection,
        #[serde(default)]
        config: CombineConfig,
    },
}

impl PipelineStep {
    fn label(&self) -> &'static str {
        match self {
            PipelineStep::FilterMissingness { .. } => "FilterMissingness",
            PipelineStep::TestMcar => "TestMcar",
            PipelineStep::Impute { .. } => "Impute",
            PipelineStep::Combine { .. } => "Combine",
        }
    }
}

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Steps to execute.
    pub steps: Vec<PipelineStep>,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(ImputeError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(ImputeError::from)
    }
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Missingness of the input matrix.
    pub missingness: MissingnessVector,
    /// Matrix after filtering (the input if no filter step ran).
    pub matrix: AbundanceMatrix,
    /// Statistics of the last filter step.
    pub filter: Option<FilterResult>,
    /// MCAR result, if the test ran and succeeded.
    pub mcar: Option<McarResult>,
    /// Error message, if the MCAR test ran and failed.
    pub mcar_error: Option<String>,
    /// Imputation ensemble.
    pub ensemble: Option<ImputationEnsemble>,
    /// Final completed matrix.
    pub completed: Option<CompletedMatrix>,
}

/// Builder for constructing and running imputation pipelines.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    name: String,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            name: "unnamed".to_string(),
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            steps: config.steps.clone(),
            name: config.name.clone(),
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Add missingness filtering.
    pub fn filter_missingness(mut self, threshold: f64) -> Self {
        self.steps.push(PipelineStep::FilterMissingness { threshold });
        self
    }

    /// Add Little's MCAR test.
    pub fn test_mcar(mut self) -> Self {
        self.steps.push(PipelineStep::TestMcar);
        self
    }

    /// Add imputation, other settings at their defaults.
    pub fn impute(mut self, method: ImputeMethod, m: usize, max_iterations: usize, seed: u64) -> Self {
        self.steps.push(PipelineStep::Impute {
            config: ImputeConfig {
                method,
                m,
                max_iterations,
                seed,
                ..ImputeConfig::default()
            },
        });
        self
    }

    /// Add imputation with a full configuration.
    pub fn impute_with(mut self, config: ImputeConfig) -> Self {
        self.steps.push(PipelineStep::Impute { config });
        self
    }

    /// Add combining with median/MAD normalization.
    pub fn combine(mut self, selection: Selection) -> Self {
        self.steps.push(PipelineStep::Combine {
            selection,
            config: CombineConfig::default(),
        });
        self
    }

    /// Add combining with explicit normalization options.
    pub fn combine_with(mut self, selection: Selection, config: CombineConfig) -> Self {
        self.steps.push(PipelineStep::Combine { selection, config });
        self
    }

    /// Get the steps.
    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            steps: self.steps.clone(),
        }
    }

    /// Check that every step has its inputs available.
    pub fn validate(&self) -> Result<()> {
        let mut imputed = false;
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PipelineStep::FilterMissingness { .. } | PipelineStep::TestMcar if imputed => {
                    return Err(ImputeError::Pipeline(format!(
                        "Step {} ({}) must come before imputation",
                        i + 1,
                        step.label()
                    )));
                }
                PipelineStep::Impute { .. } => imputed = true,
                PipelineStep::Combine { .. } if !imputed => {
                    return Err(ImputeError::Pipeline(format!(
                        "Step {} (Combine) requires a preceding Impute step",
                        i + 1
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Run the pipeline on data.
    pub fn run(&self, matrix: &AbundanceMatrix) -> Result<PipelineOutput> {
        self.validate()?;
        log::info!(
            "Running pipeline '{}' ({} steps) on {} proteins × {} samples",
            self.name,
            self.steps.len(),
            matrix.n_proteins(),
            matrix.n_samples()
        );

        let mut state = PipelineState::new(matrix)?;
        for (i, step) in self.steps.iter().enumerate() {
            state = state.apply(step).map_err(|e| {
                ImputeError::Pipeline(format!("Step {} ({:?}) failed: {}", i + 1, step, e))
            })?;
        }

        Ok(state.finish())
    }
}

/// Internal state during pipeline execution.
struct PipelineState {
    missingness: MissingnessVector,
    matrix: AbundanceMatrix,
    filter: Option<FilterResult>,
    mcar: Option<McarResult>,
    mcar_error: Option<String>,
    ensemble: Option<ImputationEnsemble>,
    completed: Option<CompletedMatrix>,
}

impl PipelineState {
    fn new(matrix: &AbundanceMatrix) -> Result<Self> {
        Ok(Self {
            missingness: compute_missingness(matrix)?,
            matrix: matrix.clone(),
            filter: None,
            mcar: None,
            mcar_error: None,
            ensemble: None,
            completed: None,
        })
    }

    fn apply(mut self, step: &PipelineStep) -> Result<Self> {
        match step {
            PipelineStep::FilterMissingness { threshold } => {
                let missingness = compute_missingness(&self.matrix)?;
                let (filtered, stats) =
                    filter_by_threshold_with_stats(&self.matrix, &missingness, *threshold)?;
                log::info!(
                    "Missingness filter removed {} of {} proteins",
                    stats.n_removed,
                    stats.n_before
                );
                self.matrix = filtered;
                self.filter = Some(stats);
            }
            PipelineStep::TestMcar => match mcar_test(&self.matrix) {
                Ok(result) => {
                    self.mcar = Some(result);
                    self.mcar_error = None;
                }
                Err(e) => {
                    log::warn!("MCAR test failed, continuing without it: {}", e);
                    self.mcar = None;
                    self.mcar_error = Some(e.to_string());
                }
            },
            PipelineStep::Impute { config } => {
                self.ensemble = Some(impute_with_config(&self.matrix, config)?);
                self.completed = None;
            }
            PipelineStep::Combine { selection, config } => {
                let ensemble = self.ensemble.as_ref().ok_or_else(|| {
                    ImputeError::Pipeline("Must impute before combining".to_string())
                })?;
                self.completed = Some(combine_with(ensemble, *selection, config)?);
            }
        }
        Ok(self)
    }

    fn finish(self) -> PipelineOutput {
        PipelineOutput {
            missingness: self.missingness,
            matrix: self.matrix,
            filter: self.filter,
            mcar: self.mcar,
            mcar_error: self.mcar_error,
            ensemble: self.ensemble,
            completed: self.completed,
        }
    }
}

/// Convenience function to run the standard workflow: filter, test MCAR,
/// impute with random forests and combine the first member.
pub fn run_standard(
    matrix: &AbundanceMatrix,
    threshold: f64,
    m: usize,
    seed: u64,
) -> Result<PipelineOutput> {
    let config = ImputeConfig {
        m,
        seed,
        ..ImputeConfig::default()
    };
    Pipeline::new()
        .name("standard")
        .filter_missingness(threshold)
        .test_mcar()
        .impute_with(config)
        .combine(Selection::Index(0))
        .run(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizationMethod;

    const NA: f64 = f64::NAN;

    /// 30 proteins × 6 samples with scattered gaps; protein 4 is 4/6 missing.
    fn create_test_matrix() -> AbundanceMatrix {
        let mut values = Vec::with_capacity(180);
        for row in 0..30 {
            let level = 12.0 + (row as f64) * 0.7;
            for col in 0..6 {
                let missing = (row == 4 && col < 4) || (row % 7 == 2 && col == row % 6);
                let noise = ((row * 13 + col * 7) % 10) as f64 * 0.15;
                values.push(if missing { NA } else { level + col as f64 * 0.3 + noise });
            }
        }
        let protein_ids: Vec<String> = (0..30).map(|i| format!("prot_{}", i)).collect();
        let sample_ids: Vec<String> = (0..6).map(|i| format!("S{}", i)).collect();
        AbundanceMatrix::from_row_slice(30, 6, &values, protein_ids, sample_ids).unwrap()
    }

    #[test]
    fn test_pipeline_builder() {
        let pipeline = Pipeline::new()
            .name("test")
            .filter_missingness(0.2)
            .test_mcar()
            .impute(ImputeMethod::Pmm, 3, 5, 7)
            .combine(Selection::Mean);

        let config = pipeline.to_config(Some("Test pipeline"));
        assert_eq!(config.steps.len(), 4);
        assert_eq!(config.name, "test");
        assert_eq!(config.description.as_deref(), Some("Test pipeline"));
    }

    #[test]
    fn test_pipeline_run() {
        let matrix = create_test_matrix();
        let output = Pipeline::new()
            .filter_missingness(0.2)
            .test_mcar()
            .impute(ImputeMethod::Rf, 2, 3, 42)
            .combine(Selection::Index(1))
            .run(&matrix)
            .unwrap();

        assert_eq!(output.missingness.len(), 30);
        assert_eq!(output.matrix.n_proteins(), 29);
        assert_eq!(output.filter.as_ref().unwrap().removed_ids, vec!["prot_4"]);
        assert!(output.mcar.is_some() || output.mcar_error.is_some());

        let ensemble = output.ensemble.unwrap();
        assert_eq!(ensemble.len(), 2);
        assert_eq!(ensemble.n_proteins(), 29);

        let completed = output.completed.unwrap();
        assert_eq!(completed.n_proteins(), 29);
        assert_eq!(completed.n_samples(), 6);
        assert!(completed.data.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_run_standard() {
        let matrix = create_test_matrix();
        let output = run_standard(&matrix, 0.2, 2, 1).unwrap();
        assert_eq!(output.ensemble.unwrap().seed, 1);
        assert_eq!(output.completed.unwrap().selection, Selection::Index(0));
    }

    #[test]
    fn test_mcar_failure_is_tolerated() {
        // No missing values: the MCAR test fails, imputation copies the input
        let values: Vec<f64> = (0..24).map(|i| 10.0 + ((i * 7) % 11) as f64).collect();
        let matrix = AbundanceMatrix::from_row_slice(
            6,
            4,
            &values,
            (0..6).map(|i| format!("P{}", i)).collect(),
            (0..4).map(|i| format!("S{}", i)).collect(),
        )
        .unwrap();

        let output = Pipeline::new()
            .test_mcar()
            .impute(ImputeMethod::Norm, 1, 2, 3)
            .combine_with(
                Selection::Index(0),
                CombineConfig {
                    normalization: NormalizationMethod::None,
                    log2: false,
                },
            )
            .run(&matrix)
            .unwrap();

        assert!(output.mcar.is_none());
        assert!(output.mcar_error.unwrap().contains("pattern"));
        assert_eq!(&output.completed.unwrap().data, matrix.data());
    }

    #[test]
    fn test_pipeline_config_yaml() {
        let pipeline = Pipeline::new()
            .name("example")
            .filter_missingness(0.3)
            .test_mcar()
            .impute_with(ImputeConfig {
                method: ImputeMethod::Cart,
                tolerance: Some(1e-3),
                ..ImputeConfig::default()
            })
            .combine_with(
                Selection::Index(2),
                CombineConfig {
                    normalization: NormalizationMethod::Scale,
                    log2: true,
                },
            );

        let yaml = pipeline.to_config(Some("Example")).to_yaml().unwrap();
        let parsed = PipelineConfig::from_yaml(&yaml).unwrap();

        assert_eq!(parsed.name, "example");
        assert_eq!(parsed.steps.len(), 4);
        match &parsed.steps[2] {
            PipelineStep::Impute { config } => {
                assert_eq!(config.method, ImputeMethod::Cart);
                assert_eq!(config.tolerance, Some(1e-3));
            }
            other => panic!("unexpected step {:?}", other),
        }
        match &parsed.steps[3] {
            PipelineStep::Combine { selection, config } => {
                assert_eq!(*selection, Selection::Index(2));
                assert!(config.log2);
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_combine_requires_impute() {
        let matrix = create_test_matrix();
        let result = Pipeline::new().combine(Selection::Mean).run(&matrix);
        assert!(matches!(result, Err(ImputeError::Pipeline(_))));
    }

    #[test]
    fn test_filter_after_impute_rejected() {
        let pipeline = Pipeline::new()
            .impute(ImputeMethod::Rf, 1, 1, 0)
            .filter_missingness(0.2);
        assert!(pipeline.validate().is_err());
    }

    #[test]
    fn test_step_error_is_wrapped() {
        let matrix = create_test_matrix();
        let err = Pipeline::new()
            .filter_missingness(0.2)
            .impute(ImputeMethod::Rf, 0, 5, 42)
            .run(&matrix)
            .unwrap_err();
        match err {
            ImputeError::Pipeline(msg) => assert!(msg.starts_with("Step 2")),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
