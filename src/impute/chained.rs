//! Chained-equations imputation for a single ensemble member.

use super::bayes::{impute_norm, impute_pmm};
use super::tree::{draw_donor, RegressionTree, TreeParams};
use super::{ImputeConfig, ImputeMethod};
use crate::data::{AbundanceMatrix, ImputationRun};
use crate::error::{ImputeError, Result};
use nalgebra::DMatrix;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Columns with missing entries and the rows on each side of the split.
#[derive(Debug, Clone)]
pub(crate) struct ColumnTarget {
    pub col: usize,
    pub observed: Vec<usize>,
    pub missing: Vec<usize>,
}

/// Collect imputation targets, rejecting entirely-missing columns.
pub(crate) fn column_targets(matrix: &AbundanceMatrix) -> Result<Vec<ColumnTarget>> {
    let mut targets = Vec::new();
    for col in 0..matrix.n_samples() {
        let (missing, observed): (Vec<usize>, Vec<usize>) =
            (0..matrix.n_proteins()).partition(|&row| matrix.is_missing(row, col));
        if observed.is_empty() {
            return Err(ImputeError::InsufficientData(format!(
                "sample '{}' has no observed values to train on",
                matrix.sample_ids()[col]
            )));
        }
        if !missing.is_empty() {
            targets.push(ColumnTarget {
                col,
                observed,
                missing,
            });
        }
    }
    Ok(targets)
}

/// RNG driving ensemble member `member`: the base seed picks the key,
/// the member index picks an independent ChaCha stream under it.
pub(crate) fn member_rng(seed: u64, member: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(member as u64);
    rng
}

/// Run one independent chain and return its completed matrix.
pub(crate) fn run_chain(
    matrix: &AbundanceMatrix,
    targets: &[ColumnTarget],
    config: &ImputeConfig,
    member: usize,
) -> Result<ImputationRun> {
    let mut rng = member_rng(config.seed, member);
    let mut data = matrix.data().clone();

    // Start from random draws of each column's observed values
    for target in targets {
        let observed: Vec<f64> = target
            .observed
            .iter()
            .map(|&row| data[(row, target.col)])
            .collect();
        for &row in &target.missing {
            if let Some(&value) = observed.choose(&mut rng) {
                data[(row, target.col)] = value;
            }
        }
    }

    let n_imputed: usize = targets.iter().map(|t| t.missing.len()).sum();
    let mut trace = Vec::with_capacity(config.max_iterations);

    for iteration in 1..=config.max_iterations {
        let mut total_change = 0.0;

        for target in targets {
            let predictors: Vec<usize> = (0..data.ncols()).filter(|&c| c != target.col).collect();
            let x_obs = gather(&data, &target.observed, &predictors);
            let x_mis = gather(&data, &target.missing, &predictors);
            let y_obs: Vec<f64> = target
                .observed
                .iter()
                .map(|&row| data[(row, target.col)])
                .collect();

            let imputed = impute_column(config, &x_obs, &y_obs, &x_mis, &mut rng)?;

            for (&row, value) in target.missing.iter().zip(imputed) {
                total_change += (value - data[(row, target.col)]).abs();
                data[(row, target.col)] = value;
            }
        }

        let mean_change = if n_imputed > 0 {
            total_change / n_imputed as f64
        } else {
            0.0
        };
        trace.push(mean_change);
        log::debug!(
            "member {} iteration {}: mean absolute change {:.6}",
            member + 1,
            iteration,
            mean_change
        );

        if let Some(tol) = config.tolerance {
            if mean_change < tol {
                log::debug!("member {} converged after {} iterations", member + 1, iteration);
                break;
            }
        }
    }

    Ok(ImputationRun {
        iterations: trace.len(),
        data,
        trace,
    })
}

/// Predict the missing rows of one column with the configured method.
fn impute_column(
    config: &ImputeConfig,
    x_obs: &DMatrix<f64>,
    y_obs: &[f64],
    x_mis: &DMatrix<f64>,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<f64>> {
    match config.method {
        ImputeMethod::Rf => Ok(impute_forest(config, x_obs, y_obs, x_mis, rng)),
        ImputeMethod::Cart => Ok(impute_tree(config, x_obs, y_obs, x_mis, rng)),
        ImputeMethod::Pmm => impute_pmm(x_obs, y_obs, x_mis, config.donors, config.ridge, rng),
        ImputeMethod::Norm => impute_norm(x_obs, y_obs, x_mis, config.ridge, rng),
    }
}

/// Random-forest donors: union of leaf-mates over bootstrapped trees.
fn impute_forest(
    config: &ImputeConfig,
    x_obs: &DMatrix<f64>,
    y_obs: &[f64],
    x_mis: &DMatrix<f64>,
    rng: &mut ChaCha8Rng,
) -> Vec<f64> {
    let n_obs = y_obs.len();
    let params = TreeParams {
        max_features: (x_obs.ncols() / 3).max(1),
        min_leaf_size: config.min_leaf_size,
    };

    let mut pools: Vec<Vec<f64>> = vec![Vec::new(); x_mis.nrows()];
    for _ in 0..config.n_trees {
        let bootstrap: Vec<usize> = (0..n_obs).map(|_| rng.gen_range(0..n_obs)).collect();
        let tree = RegressionTree::fit(x_obs, y_obs, &bootstrap, params, rng);
        let leaf_donors = tree.donor_pools(x_obs, y_obs);
        for (row, pool) in pools.iter_mut().enumerate() {
            pool.extend_from_slice(&leaf_donors[tree.leaf_of(x_mis, row)]);
        }
    }

    pools.iter().map(|pool| draw_donor(pool, rng)).collect()
}

/// Single-tree donors on all observed rows and predictors.
fn impute_tree(
    config: &ImputeConfig,
    x_obs: &DMatrix<f64>,
    y_obs: &[f64],
    x_mis: &DMatrix<f64>,
    rng: &mut ChaCha8Rng,
) -> Vec<f64> {
    let rows: Vec<usize> = (0..y_obs.len()).collect();
    let params = TreeParams {
        max_features: x_obs.ncols(),
        min_leaf_size: config.min_leaf_size,
    };
    let tree = RegressionTree::fit(x_obs, y_obs, &rows, params, rng);
    let leaf_donors = tree.donor_pools(x_obs, y_obs);

    (0..x_mis.nrows())
        .map(|row| draw_donor(&leaf_donors[tree.leaf_of(x_mis, row)], rng))
        .collect()
}

/// Copy the given rows and columns of `data` into a new matrix.
fn gather(data: &DMatrix<f64>, rows: &[usize], cols: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), cols.len(), |i, j| data[(rows[i], cols[j])])
}
