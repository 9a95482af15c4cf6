//! Per-sample location and spread normalization of completed matrices.
//!
//! Both methods rescale every sample (column) toward a common reference so
//! that samples become comparable after imputation. They are monotone within
//! a column, so the ordering of values in each sample is preserved.

use crate::error::{ImputeError, Result};
use crate::stats::{geometric_mean, mad, median};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A normalized matrix with the per-sample statistics that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedMatrix {
    /// Normalized data (proteins × samples).
    pub data: DMatrix<f64>,
    /// Per-sample center (median for MAD, 0 for scaling).
    pub centers: Vec<f64>,
    /// Per-sample spread (MAD, or median absolute value for scaling).
    pub spreads: Vec<f64>,
    /// Center every sample is moved to.
    pub reference_center: f64,
    /// Spread every sample is rescaled to.
    pub reference_spread: f64,
}

impl NormalizedMatrix {
    /// Wrap data that was left unchanged.
    pub fn identity(data: DMatrix<f64>) -> Self {
        let n_samples = data.ncols();
        Self {
            data,
            centers: vec![0.0; n_samples],
            spreads: vec![1.0; n_samples],
            reference_center: 0.0,
            reference_spread: 1.0,
        }
    }
}

fn check_complete(data: &DMatrix<f64>, method: &str) -> Result<()> {
    if data.nrows() == 0 || data.ncols() == 0 {
        return Err(ImputeError::InsufficientData(format!(
            "cannot apply {} normalization to an empty matrix",
            method
        )));
    }
    if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
        let (row, col) = (pos % data.nrows(), pos / data.nrows());
        return Err(ImputeError::InvalidInput(format!(
            "{} normalization requires a complete matrix; found {} at ({}, {})",
            method,
            data[(row, col)],
            row,
            col
        )));
    }
    Ok(())
}

/// Median/MAD normalization.
///
/// # Formula
/// For sample j with median c_j and MAD s_j:
/// x'_ij = (x_ij - c_j) · (s_ref / s_j) + c_ref
///
/// where c_ref is the median of the c_j and s_ref the geometric mean of
/// the s_j.
///
/// # Errors
/// `Numerical` if any sample has a MAD of zero.
pub fn normalize_mad(data: &DMatrix<f64>) -> Result<NormalizedMatrix> {
    check_complete(data, "MAD")?;

    let stats: Vec<(f64, f64)> = (0..data.ncols())
        .into_par_iter()
        .map(|j| {
            let col: Vec<f64> = data.column(j).iter().copied().collect();
            let c = median(&col);
            (c, mad(&col, c))
        })
        .collect();
    let (centers, spreads): (Vec<f64>, Vec<f64>) = stats.into_iter().unzip();

    if let Some(j) = spreads.iter().position(|&s| s <= 0.0) {
        return Err(ImputeError::Numerical(format!(
            "sample {} has zero median absolute deviation",
            j
        )));
    }

    let reference_center = median(&centers);
    let reference_spread = geometric_mean(&spreads);

    let mut out = data.clone();
    for (j, mut col) in out.column_iter_mut().enumerate() {
        let factor = reference_spread / spreads[j];
        for v in col.iter_mut() {
            *v = (*v - centers[j]) * factor + reference_center;
        }
    }

    Ok(NormalizedMatrix {
        data: out,
        centers,
        spreads,
        reference_center,
        reference_spread,
    })
}

/// Median-absolute-value scaling.
///
/// # Formula
/// For sample j with a_j = median(|x_j|): x'_ij = x_ij · (a_ref / a_j),
/// where a_ref is the geometric mean of the a_j.
///
/// # Errors
/// `Numerical` if any sample has a median absolute value of zero.
pub fn normalize_scale(data: &DMatrix<f64>) -> Result<NormalizedMatrix> {
    check_complete(data, "scale")?;

    let spreads: Vec<f64> = (0..data.ncols())
        .into_par_iter()
        .map(|j| {
            let abs: Vec<f64> = data.column(j).iter().map(|v| v.abs()).collect();
            median(&abs)
        })
        .collect();

    if let Some(j) = spreads.iter().position(|&s| s <= 0.0) {
        return Err(ImputeError::Numerical(format!(
            "sample {} has zero median absolute value",
            j
        )));
    }

    let reference_spread = geometric_mean(&spreads);
    let mut out = data.clone();
    for (j, mut col) in out.column_iter_mut().enumerate() {
        col *= reference_spread / spreads[j];
    }

    Ok(NormalizedMatrix {
        data: out,
        centers: vec![0.0; spreads.len()],
        spreads,
        reference_center: 0.0,
        reference_spread,
    })
}
