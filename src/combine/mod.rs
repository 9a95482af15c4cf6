//! Reduce an imputation ensemble to one completed matrix.
//!
//! A member is selected by index, or the members are pooled cell-wise, then
//! the result is normalized so samples share a common center and spread.

pub mod completed;

pub use completed::CompletedMatrix;

use crate::data::ImputationEnsemble;
use crate::error::{ImputeError, Result};
use crate::normalize::{log2_transform, NormalizationMethod};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// How to obtain one matrix from the ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// A single member, 0-based.
    Index(usize),
    /// Cell-wise mean across members.
    Mean,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Index(0)
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selection::Index(i) => write!(f, "member {}", i),
            Selection::Mean => write!(f, "mean of members"),
        }
    }
}

/// Post-selection transformation options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineConfig {
    /// Normalization method.
    pub normalization: NormalizationMethod,
    /// Apply log2 before normalizing.
    pub log2: bool,
}

/// Combine with the default median/MAD normalization.
pub fn combine(ensemble: &ImputationEnsemble, selection: Selection) -> Result<CompletedMatrix> {
    combine_with(ensemble, selection, &CombineConfig::default())
}

/// Combine with explicit normalization options.
///
/// # Errors
/// - `IndexOutOfRange` if `Selection::Index(i)` has `i >= ensemble.len()`
/// - `InsufficientData` when pooling an empty ensemble
/// - `Numerical` if a sample has zero spread or log2 meets a non-positive value
pub fn combine_with(
    ensemble: &ImputationEnsemble,
    selection: Selection,
    config: &CombineConfig,
) -> Result<CompletedMatrix> {
    let selected = select(ensemble, selection)?;
    let selected = if config.log2 {
        log2_transform(&selected)?
    } else {
        selected
    };
    let normalized = config.normalization.apply(&selected)?;

    log::info!(
        "Combined {} members ({}) with {} normalization{}",
        ensemble.len(),
        selection,
        config.normalization,
        if config.log2 { " after log2" } else { "" }
    );

    Ok(CompletedMatrix {
        data: normalized.data,
        protein_ids: ensemble.protein_ids.clone(),
        sample_ids: ensemble.sample_ids.clone(),
        selection,
        normalization: config.normalization,
        log2: config.log2,
        centers: normalized.centers,
        spreads: normalized.spreads,
        reference_center: normalized.reference_center,
        reference_spread: normalized.reference_spread,
    })
}

fn select(ensemble: &ImputationEnsemble, selection: Selection) -> Result<DMatrix<f64>> {
    match selection {
        Selection::Index(index) => Ok(ensemble.member(index)?.clone()),
        Selection::Mean => {
            let first = ensemble.member(0).map_err(|_| {
                ImputeError::InsufficientData("cannot pool an empty ensemble".to_string())
            })?;
            let mut sum = first.clone();
            for run in &ensemble.members[1..] {
                sum += &run.data;
            }
            Ok(sum / ensemble.len() as f64)
        }
    }
}
