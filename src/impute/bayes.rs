//! Bayesian linear regression draws for `Pmm` and `Norm` imputation.

use crate::error::{ImputeError, Result};
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{ChiSquared, Distribution, StandardNormal};

/// One posterior draw of the regression parameters.
#[derive(Debug, Clone)]
pub(crate) struct RegressionDraw {
    /// Least-squares coefficients (intercept first).
    pub coef: DVector<f64>,
    /// Coefficients drawn around `coef`.
    pub beta_star: DVector<f64>,
    /// Drawn residual standard deviation.
    pub sigma_star: f64,
}

/// Prepend an intercept column.
pub(crate) fn with_intercept(x: &DMatrix<f64>) -> DMatrix<f64> {
    let (n, p) = x.shape();
    DMatrix::from_fn(n, p + 1, |i, j| if j == 0 { 1.0 } else { x[(i, j - 1)] })
}

/// Fit ridge-stabilized OLS and draw (β*, σ*) from its approximate posterior.
///
/// `x` must already contain the intercept column.
pub(crate) fn draw_regression(
    x: &DMatrix<f64>,
    y: &[f64],
    ridge: f64,
    rng: &mut ChaCha8Rng,
) -> Result<RegressionDraw> {
    let (n, q) = x.shape();
    let y_vec = DVector::from_column_slice(y);

    let mut xtx = x.transpose() * x;
    for j in 0..q {
        let pen = ridge * xtx[(j, j)];
        xtx[(j, j)] += if pen > 0.0 { pen } else { ridge };
    }

    let chol = xtx.cholesky().ok_or_else(|| {
        ImputeError::Numerical("regression cross-product is not positive definite".to_string())
    })?;
    let v = chol.inverse();
    let coef = &v * (x.transpose() * &y_vec);

    let residuals = &y_vec - x * &coef;
    let rss: f64 = residuals.iter().map(|e| e * e).sum();

    let df = n.saturating_sub(q).max(1) as f64;
    let chi = ChiSquared::new(df)
        .map_err(|e| ImputeError::Numerical(format!("invalid chi-squared draw: {}", e)))?;
    let chi_draw: f64 = chi.sample(rng);
    let sigma_star = (rss / chi_draw.max(f64::MIN_POSITIVE)).sqrt();

    let v_chol = v.clone().cholesky().ok_or_else(|| {
        ImputeError::Numerical("coefficient covariance is not positive definite".to_string())
    })?;
    let z = DVector::from_fn(q, |_, _| rng.sample::<f64, _>(StandardNormal));
    let beta_star = &coef + v_chol.l() * z * sigma_star;

    Ok(RegressionDraw {
        coef,
        beta_star,
        sigma_star,
    })
}

/// Predictive mean matching: each missing row takes the observed target of a
/// random donor among the `donors` closest observed predictions.
pub(crate) fn impute_pmm(
    x_obs: &DMatrix<f64>,
    y_obs: &[f64],
    x_mis: &DMatrix<f64>,
    donors: usize,
    ridge: f64,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<f64>> {
    let x_obs = with_intercept(x_obs);
    let x_mis = with_intercept(x_mis);
    let draw = draw_regression(&x_obs, y_obs, ridge, rng)?;

    let yhat_obs = &x_obs * &draw.coef;
    let yhat_mis = &x_mis * &draw.beta_star;
    let k = donors.clamp(1, y_obs.len());

    let imputed = yhat_mis
        .iter()
        .map(|&target| {
            let mut distances: Vec<(f64, usize)> = yhat_obs
                .iter()
                .enumerate()
                .map(|(i, &pred)| ((pred - target).abs(), i))
                .collect();
            distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            let pick = distances[rng.gen_range(0..k)].1;
            y_obs[pick]
        })
        .collect();

    Ok(imputed)
}

/// Normal linear-regression imputation: X_mis β* plus N(0, σ*²) noise.
pub(crate) fn impute_norm(
    x_obs: &DMatrix<f64>,
    y_obs: &[f64],
    x_mis: &DMatrix<f64>,
    ridge: f64,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<f64>> {
    let x_obs = with_intercept(x_obs);
    let x_mis = with_intercept(x_mis);
    let draw = draw_regression(&x_obs, y_obs, ridge, rng)?;

    let yhat_mis = &x_mis * &draw.beta_star;
    Ok(yhat_mis
        .iter()
        .map(|&mean| {
            let z: f64 = rng.sample(StandardNormal);
            mean + z * draw.sigma_star
        })
        .collect())
}
