//! Sample-by-sample correlation of a completed matrix.

use crate::error::{ImputeError, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Pearson correlation between the columns (samples) of a complete matrix.
///
/// Returns a symmetric samples × samples matrix with ones on the diagonal.
pub fn sample_correlation(data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let (n_rows, n_cols) = data.shape();
    if n_rows < 2 || n_cols == 0 {
        return Err(ImputeError::InsufficientData(
            "correlation needs at least two proteins and one sample".to_string(),
        ));
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(ImputeError::InvalidInput(
            "correlation requires a complete matrix without missing values".to_string(),
        ));
    }

    let centered: Vec<Vec<f64>> = (0..n_cols)
        .into_par_iter()
        .map(|j| {
            let col = data.column(j);
            let mean = col.iter().sum::<f64>() / n_rows as f64;
            col.iter().map(|v| v - mean).collect()
        })
        .collect();

    let norms: Vec<f64> = centered
        .iter()
        .map(|c| c.iter().map(|v| v * v).sum::<f64>().sqrt())
        .collect();
    if let Some(j) = norms.iter().position(|&n| n == 0.0) {
        return Err(ImputeError::Numerical(format!(
            "sample {} has zero variance",
            j
        )));
    }

    let mut corr = DMatrix::identity(n_cols, n_cols);
    for a in 0..n_cols {
        for b in (a + 1)..n_cols {
            let dot: f64 = centered[a].iter().zip(&centered[b]).map(|(x, y)| x * y).sum();
            let r = (dot / (norms[a] * norms[b])).clamp(-1.0, 1.0);
            corr[(a, b)] = r;
            corr[(b, a)] = r;
        }
    }
    Ok(corr)
}
