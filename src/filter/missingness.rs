//! Missingness-based filtering for abundance matrices.

use crate::data::AbundanceMatrix;
use crate::error::{ImputeError, Result};
use crate::profile::MissingnessVector;
use serde::{Deserialize, Serialize};

/// Default maximum fraction of missing samples per protein.
pub const DEFAULT_MISSINGNESS_THRESHOLD: f64 = 0.20;

/// Filter proteins by missingness threshold.
///
/// Keeps proteins whose missingness is at most `threshold`, preserving the
/// original row order and all samples. An empty result is valid.
///
/// # Arguments
/// * `matrix` - The abundance matrix to filter
/// * `missingness` - Missingness vector computed from `matrix`
/// * `threshold` - Maximum missingness (0.0 to 1.0)
pub fn filter_by_threshold(
    matrix: &AbundanceMatrix,
    missingness: &MissingnessVector,
    threshold: f64,
) -> Result<AbundanceMatrix> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ImputeError::InvalidConfig(
            "Missingness threshold must be between 0 and 1".to_string(),
        ));
    }
    if missingness.len() != matrix.n_proteins() {
        return Err(ImputeError::DimensionMismatch {
            expected: matrix.n_proteins(),
            actual: missingness.len(),
        });
    }

    let keep_indices = missingness.indices_at_or_below(threshold);
    log::debug!(
        "Missingness filter at {:.1}% keeps {} of {} proteins",
        threshold * 100.0,
        keep_indices.len(),
        matrix.n_proteins()
    );

    matrix.subset_proteins(&keep_indices)
}

/// Result of missingness filtering with statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResult {
    /// Number of proteins before filtering.
    pub n_before: usize,
    /// Number of proteins after filtering.
    pub n_after: usize,
    /// Number of proteins removed.
    pub n_removed: usize,
    /// Proportion of proteins retained.
    pub retention_rate: f64,
    /// Identifiers of the removed proteins.
    pub removed_ids: Vec<String>,
}

impl std::fmt::Display for FilterResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Filter Result")?;
        writeln!(f, "  Before:    {} proteins", self.n_before)?;
        writeln!(f, "  After:     {} proteins", self.n_after)?;
        writeln!(f, "  Removed:   {} proteins", self.n_removed)?;
        writeln!(f, "  Retained:  {:.1}%", self.retention_rate * 100.0)?;
        Ok(())
    }
}

/// Filter with statistics about what was filtered.
pub fn filter_by_threshold_with_stats(
    matrix: &AbundanceMatrix,
    missingness: &MissingnessVector,
    threshold: f64,
) -> Result<(AbundanceMatrix, FilterResult)> {
    let n_before = matrix.n_proteins();
    let filtered = filter_by_threshold(matrix, missingness, threshold)?;
    let n_after = filtered.n_proteins();

    let removed_ids = matrix
        .protein_ids()
        .iter()
        .zip(&missingness.values)
        .filter(|(_, &m)| m > threshold)
        .map(|(id, _)| id.clone())
        .collect();

    let result = FilterResult {
        n_before,
        n_after,
        n_removed: n_before - n_after,
        retention_rate: if n_before > 0 {
            n_after as f64 / n_before as f64
        } else {
            0.0
        },
        removed_ids,
    };

    Ok((filtered, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::compute_missingness;

    const NA: f64 = f64::NAN;

    /// 10 proteins × 5 samples: protein 3 is 60% missing, the rest 0–20%.
    fn create_test_matrix() -> AbundanceMatrix {
        let mut values = Vec::with_capacity(50);
        for row in 0..10 {
            for col in 0..5 {
                let missing = match row {
                    3 => col < 3,
                    7 => col == 4,
                    _ => false,
                };
                values.push(if missing { NA } else { (row * 10 + col) as f64 + 1.0 });
            }
        }
        let protein_ids: Vec<String> = (0..10).map(|i| format!("prot_{}", i)).collect();
        let sample_ids: Vec<String> = (0..5).map(|i| format!("S{}", i)).collect();
        AbundanceMatrix::from_row_slice(10, 5, &values, protein_ids, sample_ids).unwrap()
    }

    #[test]
    fn test_filter_removes_sparse_protein() {
        let matrix = create_test_matrix();
        let missingness = compute_missingness(&matrix).unwrap();
        let filtered = filter_by_threshold(&matrix, &missingness, 0.20).unwrap();

        assert_eq!(filtered.n_proteins(), 9);
        assert_eq!(filtered.n_samples(), 5);
        assert!(!filtered.protein_ids().contains(&"prot_3".to_string()));
        // 20% missing sits exactly on the threshold and is kept
        assert!(filtered.protein_ids().contains(&"prot_7".to_string()));
        assert_eq!(filtered.protein_ids()[3], "prot_4");
    }

    #[test]
    fn test_filter_idempotent() {
        let matrix = create_test_matrix();
        let missingness = compute_missingness(&matrix).unwrap();
        let once = filter_by_threshold(&matrix, &missingness, 0.20).unwrap();
        let again = filter_by_threshold(&once, &compute_missingness(&once).unwrap(), 0.20).unwrap();

        assert_eq!(once.protein_ids(), again.protein_ids());
        assert_eq!(once.sample_ids(), again.sample_ids());
        for row in 0..once.n_proteins() {
            for col in 0..once.n_samples() {
                assert_eq!(once.get(row, col), again.get(row, col));
            }
        }
    }

    #[test]
    fn test_filter_can_be_empty() {
        let matrix = create_test_matrix();
        let missingness = compute_missingness(&matrix).unwrap();
        let strict = filter_by_threshold(&matrix, &missingness, 0.0).unwrap();
        assert_eq!(strict.n_proteins(), 8);

        let all_missing = AbundanceMatrix::from_row_slice(
            1,
            2,
            &[NA, NA],
            vec!["P".into()],
            vec!["S1".into(), "S2".into()],
        )
        .unwrap();
        let m = compute_missingness(&all_missing).unwrap();
        let empty = filter_by_threshold(&all_missing, &m, 0.5).unwrap();
        assert_eq!(empty.n_proteins(), 0);
        assert_eq!(empty.n_samples(), 2);
    }

    #[test]
    fn test_filter_with_stats() {
        let matrix = create_test_matrix();
        let missingness = compute_missingness(&matrix).unwrap();
        let (_, stats) = filter_by_threshold_with_stats(&matrix, &missingness, 0.20).unwrap();

        assert_eq!(stats.n_before, 10);
        assert_eq!(stats.n_after, 9);
        assert_eq!(stats.n_removed, 1);
        assert_eq!(stats.removed_ids, vec!["prot_3"]);
        assert!((stats.retention_rate - 0.9).abs() < 1e-10);
    }

    #[test]
    fn test_invalid_threshold() {
        let matrix = create_test_matrix();
        let missingness = compute_missingness(&matrix).unwrap();
        assert!(matches!(
            filter_by_threshold(&matrix, &missingness, -0.1),
            Err(ImputeError::InvalidConfig(_))
        ));
        assert!(matches!(
            filter_by_threshold(&matrix, &missingness, 1.1),
            Err(ImputeError::InvalidConfig(_))
        ));
        assert!(filter_by_threshold(&matrix, &missingness, f64::NAN).is_err());
    }

    #[test]
    fn test_mismatched_missingness() {
        let matrix = create_test_matrix();
        let missingness = compute_missingness(&matrix.subset_proteins(&[0, 1]).unwrap()).unwrap();
        assert!(matches!(
            filter_by_threshold(&matrix, &missingness, 0.2),
            Err(ImputeError::DimensionMismatch { .. })
        ));
    }
}
