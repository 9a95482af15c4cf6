//! Log transformation of abundances.

use crate::error::{ImputeError, Result};
use nalgebra::DMatrix;

/// Apply log2 to every value.
///
/// Values must be strictly positive; imputed values from a normal model can
/// fall below zero, in which case the transform is refused.
pub fn log2_transform(data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if let Some(pos) = data.iter().position(|&v| !v.is_finite() || v <= 0.0) {
        let (row, col) = (pos % data.nrows(), pos / data.nrows());
        return Err(ImputeError::Numerical(format!(
            "log2 requires positive finite values; found {} at ({}, {})",
            data[(row, col)],
            row,
            col
        )));
    }
    Ok(data.map(f64::log2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log2() {
        let data = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 8.0, 1024.0]);
        let out = log2_transform(&data).unwrap();
        assert_eq!(out[(0, 0)], 0.0);
        assert_eq!(out[(0, 1)], 1.0);
        assert_eq!(out[(1, 0)], 3.0);
        assert_eq!(out[(1, 1)], 10.0);
    }

    #[test]
    fn test_log2_rejects_non_positive() {
        let data = DMatrix::from_row_slice(1, 3, &[1.0, 0.0, 2.0]);
        assert!(matches!(log2_transform(&data), Err(ImputeError::Numerical(_))));
        let data = DMatrix::from_row_slice(1, 2, &[1.0, -3.0]);
        assert!(log2_transform(&data).is_err());
    }
}
