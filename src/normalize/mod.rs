//! Normalization methods for completed abundance matrices.
//!
//! - **MAD**: align sample medians and median absolute deviations (default)
//! - **Scale**: rescale samples to a common median absolute value
//! - **None**: leave values unchanged
//!
//! An optional log2 transform is available separately.

pub mod spread;
pub mod transform;

pub use transform::log2_transform;
pub use spread::{normalize_mad, normalize_scale, NormalizedMatrix};

use crate::error::Result;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Normalization applied when combining an ensemble.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMethod {
    /// Median/MAD alignment.
    #[default]
    Mad,
    /// Median absolute value scaling.
    Scale,
    /// No normalization.
    None,
}

impl NormalizationMethod {
    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            NormalizationMethod::Mad => "mad",
            NormalizationMethod::Scale => "scale",
            NormalizationMethod::None => "none",
        }
    }

    /// Apply this normalization to a complete matrix.
    pub fn apply(&self, data: &DMatrix<f64>) -> Result<NormalizedMatrix> {
        match self {
            NormalizationMethod::Mad => normalize_mad(data),
            NormalizationMethod::Scale => normalize_scale(data),
            NormalizationMethod::None => Ok(NormalizedMatrix::identity(data.clone())),
        }
    }
}

impl std::fmt::Display for NormalizationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_identity() {
        let data = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let out = NormalizationMethod::None.apply(&data).unwrap();
        assert_eq!(out.data, data);
        assert_eq!(out.spreads, vec![1.0, 1.0]);
    }

    #[test]
    fn test_serde_names() {
        let yaml = serde_yaml::to_string(&NormalizationMethod::Scale).unwrap();
        assert_eq!(yaml.trim(), "scale");
        let parsed: NormalizationMethod = serde_yaml::from_str("mad").unwrap();
        assert_eq!(parsed, NormalizationMethod::Mad);
    }
}
