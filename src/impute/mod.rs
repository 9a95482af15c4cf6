//! Multiple imputation by chained equations.
//!
//! Each ensemble member runs an independent chain: missing cells are first
//! filled with random draws from their column's observed values, then each
//! incomplete column is repeatedly re-imputed from a model fitted on all
//! other columns. Members own their RNG and output slot, so they run in
//! parallel with rayon and still produce the same ensemble for a given seed.
//!
//! # Example
//!
//! ```no_run
//! use proteo_impute::prelude::*;
//!
//! let matrix = AbundanceMatrix::from_tsv("abundances.tsv").unwrap();
//! let ensemble = impute(&matrix, ImputeMethod::Rf, 3, 5, 42).unwrap();
//! assert_eq!(ensemble.len(), 3);
//! ```

mod bayes;
mod chained;
mod tree;

use crate::data::{AbundanceMatrix, ImputationEnsemble};
use crate::error::{ImputeError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Conditional model used to impute one column from the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImputeMethod {
    /// Random forest of bootstrapped regression trees; draws a leaf-mate donor.
    #[default]
    Rf,
    /// Single regression tree; draws a leaf-mate donor.
    Cart,
    /// Predictive mean matching on a Bayesian linear regression.
    Pmm,
    /// Bayesian linear regression with residual noise.
    ///
    /// Draws are unbounded and can be negative, so the result is not suited
    /// to a later log2 transform; use a donor method (`Rf`, `Cart`, `Pmm`)
    /// when combining with `log2: true`.
    Norm,
}

impl ImputeMethod {
    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            ImputeMethod::Rf => "rf",
            ImputeMethod::Cart => "cart",
            ImputeMethod::Pmm => "pmm",
            ImputeMethod::Norm => "norm",
        }
    }
}

impl std::fmt::Display for ImputeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Configuration for multiple imputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputeConfig {
    /// Conditional model.
    pub method: ImputeMethod,
    /// Number of completed datasets (M).
    pub m: usize,
    /// Maximum chained-equation iterations per member.
    pub max_iterations: usize,
    /// Base random seed; member k derives its own seed from it.
    pub seed: u64,
    /// Stop a member early once the mean absolute change of imputed cells
    /// in an iteration falls below this value.
    pub tolerance: Option<f64>,
    /// Trees per forest (`Rf`).
    pub n_trees: usize,
    /// Minimum training rows per leaf (`Rf`, `Cart`).
    pub min_leaf_size: usize,
    /// Candidate donors per missing cell (`Pmm`).
    pub donors: usize,
    /// Ridge penalty added to the regression cross-product (`Pmm`, `Norm`).
    pub ridge: f64,
}

impl Default for ImputeConfig {
    fn default() -> Self {
        Self {
            method: ImputeMethod::Rf,
            m: 3,
            max_iterations: 5,
            seed: 42,
            tolerance: None,
            n_trees: 10,
            min_leaf_size: 5,
            donors: 5,
            ridge: 1e-5,
        }
    }
}

impl ImputeConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.m < 1 {
            return Err(ImputeError::InvalidConfig(
                "number of imputations must be at least 1".to_string(),
            ));
        }
        if self.max_iterations < 1 {
            return Err(ImputeError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.n_trees < 1 {
            return Err(ImputeError::InvalidConfig("n_trees must be at least 1".to_string()));
        }
        if self.min_leaf_size < 1 {
            return Err(ImputeError::InvalidConfig(
                "min_leaf_size must be at least 1".to_string(),
            ));
        }
        if self.donors < 1 {
            return Err(ImputeError::InvalidConfig("donors must be at least 1".to_string()));
        }
        if !self.ridge.is_finite() || self.ridge < 0.0 {
            return Err(ImputeError::InvalidConfig(
                "ridge penalty must be finite and non-negative".to_string(),
            ));
        }
        if let Some(tol) = self.tolerance {
            if tol.is_nan() || tol < 0.0 {
                return Err(ImputeError::InvalidConfig(
                    "tolerance must be non-negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Impute missing values, producing `m` completed matrices.
///
/// # Arguments
/// * `matrix` - Abundance matrix with missing cells
/// * `method` - Conditional model for each column
/// * `m` - Ensemble size
/// * `max_iterations` - Chained-equation iterations per member
/// * `seed` - Base random seed
pub fn impute(
    matrix: &AbundanceMatrix,
    method: ImputeMethod,
    m: usize,
    max_iterations: usize,
    seed: u64,
) -> Result<ImputationEnsemble> {
    let config = ImputeConfig {
        method,
        m,
        max_iterations,
        seed,
        ..ImputeConfig::default()
    };
    impute_with_config(matrix, &config)
}

/// Impute missing values with full control over the model parameters.
pub fn impute_with_config(matrix: &AbundanceMatrix, config: &ImputeConfig) -> Result<ImputationEnsemble> {
    config.validate()?;

    if matrix.is_empty() {
        return Err(ImputeError::InsufficientData(
            "cannot impute an empty matrix".to_string(),
        ));
    }
    if matrix.n_samples() < 2 {
        return Err(ImputeError::InsufficientData(
            "imputation needs at least two samples to use as predictors".to_string(),
        ));
    }

    let targets = chained::column_targets(matrix)?;
    let n_missing: usize = targets.iter().map(|t| t.missing.len()).sum();

    log::info!(
        "Imputing {} missing cells in {} of {} samples ({} method, m = {}, maxit = {})",
        n_missing,
        targets.len(),
        matrix.n_samples(),
        config.method,
        config.m,
        config.max_iterations
    );

    let members = (0..config.m)
        .into_par_iter()
        .map(|member| chained::run_chain(matrix, &targets, config, member))
        .collect::<Result<Vec<_>>>()?;

    let imputed_cells: Vec<(usize, usize)> = targets
        .iter()
        .flat_map(|t| t.missing.iter().map(move |&row| (row, t.col)))
        .collect();

    Ok(ImputationEnsemble {
        members,
        protein_ids: matrix.protein_ids().to_vec(),
        sample_ids: matrix.sample_ids().to_vec(),
        imputed_cells,
        method: config.method,
        seed: config.seed,
        max_iterations: config.max_iterations,
    })
}
