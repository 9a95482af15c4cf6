//! Missingness profiling for abundance matrices.

use crate::data::AbundanceMatrix;
use crate::error::{ImputeError, Result};
use crate::stats::{mean, median};
use serde::{Deserialize, Serialize};

/// Fraction of missing entries per protein, aligned with the matrix rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingnessVector {
    /// Protein identifiers, in row order.
    pub protein_ids: Vec<String>,
    /// Missing count / number of samples, per protein.
    pub values: Vec<f64>,
}

impl MissingnessVector {
    /// Number of proteins.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Missingness of protein `row`.
    pub fn get(&self, row: usize) -> Option<f64> {
        self.values.get(row).copied()
    }

    /// Indices of proteins with missingness at or below `threshold`.
    pub fn indices_at_or_below(&self, threshold: f64) -> Vec<usize> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, &m)| m <= threshold)
            .map(|(i, _)| i)
            .collect()
    }

    /// Equal-width histogram of missingness on [0, 1]; the last bin is closed.
    pub fn histogram(&self, n_bins: usize) -> Vec<HistogramBin> {
        missingness_histogram(&self.values, n_bins)
    }
}

/// One bin of a missingness histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Lower edge (inclusive).
    pub lower: f64,
    /// Upper edge (exclusive, except for the last bin).
    pub upper: f64,
    /// Number of proteins in the bin.
    pub count: usize,
}

/// Compute per-protein missingness.
///
/// Entry i is the number of missing cells in row i divided by the number of
/// samples.
pub fn compute_missingness(matrix: &AbundanceMatrix) -> Result<MissingnessVector> {
    let n_samples = matrix.n_samples();
    if n_samples == 0 {
        return Err(ImputeError::InvalidInput(
            "cannot compute missingness of a matrix with zero samples".to_string(),
        ));
    }

    let values = (0..matrix.n_proteins())
        .map(|row| matrix.row_missing_count(row) as f64 / n_samples as f64)
        .collect();

    Ok(MissingnessVector {
        protein_ids: matrix.protein_ids().to_vec(),
        values,
    })
}

/// Profile of missingness characteristics in an abundance matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingnessProfile {
    /// Number of proteins.
    pub n_proteins: usize,
    /// Number of samples.
    pub n_samples: usize,
    /// Total number of entries (proteins × samples).
    pub total_entries: usize,
    /// Number of missing entries.
    pub missing_entries: usize,
    /// Overall proportion of missing entries.
    pub missingness: f64,
    /// Missingness per protein (row).
    pub protein_missingness: Vec<f64>,
    /// Missingness per sample (column).
    pub sample_missingness: Vec<f64>,
    /// Mean missingness across proteins.
    pub mean_protein_missingness: f64,
    /// Median missingness across proteins.
    pub median_protein_missingness: f64,
    /// Mean missingness across samples.
    pub mean_sample_missingness: f64,
    /// Median missingness across samples.
    pub median_sample_missingness: f64,
    /// Proteins observed in every sample.
    pub n_complete_proteins: usize,
    /// Proteins missing in every sample.
    pub n_empty_proteins: usize,
    /// Histogram of protein missingness.
    pub histogram: Vec<HistogramBin>,
}

impl MissingnessProfile {
    /// Number of proteins above a missingness threshold.
    pub fn n_above(&self, threshold: f64) -> usize {
        self.protein_missingness.iter().filter(|&&m| m > threshold).count()
    }
}

impl std::fmt::Display for MissingnessProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Missingness Profile")?;
        writeln!(f, "  Proteins:          {}", self.n_proteins)?;
        writeln!(f, "  Samples:           {}", self.n_samples)?;
        writeln!(f, "  Total entries:     {}", self.total_entries)?;
        writeln!(f, "  Missing entries:   {}", self.missing_entries)?;
        writeln!(f, "  Overall missing:   {:.2}%", self.missingness * 100.0)?;
        writeln!(f, "  Mean protein missingness:   {:.2}%", self.mean_protein_missingness * 100.0)?;
        writeln!(f, "  Median protein missingness: {:.2}%", self.median_protein_missingness * 100.0)?;
        writeln!(f, "  Mean sample missingness:    {:.2}%", self.mean_sample_missingness * 100.0)?;
        writeln!(f, "  Median sample missingness:  {:.2}%", self.median_sample_missingness * 100.0)?;
        writeln!(f, "  Complete proteins: {}", self.n_complete_proteins)?;
        writeln!(f, "  Empty proteins:    {}", self.n_empty_proteins)?;
        writeln!(f, "  Histogram:")?;
        for bin in &self.histogram {
            writeln!(f, "    [{:.2}, {:.2}) {}", bin.lower, bin.upper, bin.count)?;
        }
        Ok(())
    }
}

/// Profile missingness characteristics of an abundance matrix.
pub fn profile_missingness(matrix: &AbundanceMatrix, n_bins: usize) -> Result<MissingnessProfile> {
    let missingness = compute_missingness(matrix)?;
    let n_proteins = matrix.n_proteins();
    let n_samples = matrix.n_samples();
    let total_entries = n_proteins * n_samples;
    let missing_entries = matrix.n_missing();

    let sample_missingness: Vec<f64> = (0..n_samples)
        .map(|col| {
            if n_proteins == 0 {
                0.0
            } else {
                matrix.col_missing_count(col) as f64 / n_proteins as f64
            }
        })
        .collect();

    let protein_missingness = missingness.values;

    Ok(MissingnessProfile {
        n_proteins,
        n_samples,
        total_entries,
        missing_entries,
        missingness: if total_entries > 0 {
            missing_entries as f64 / total_entries as f64
        } else {
            0.0
        },
        mean_protein_missingness: mean(&protein_missingness),
        median_protein_missingness: median(&protein_missingness),
        mean_sample_missingness: mean(&sample_missingness),
        median_sample_missingness: median(&sample_missingness),
        n_complete_proteins: protein_missingness.iter().filter(|&&m| m == 0.0).count(),
        n_empty_proteins: protein_missingness.iter().filter(|&&m| m == 1.0).count(),
        histogram: missingness_histogram(&protein_missingness, n_bins),
        protein_missingness,
        sample_missingness,
    })
}

fn missingness_histogram(values: &[f64], n_bins: usize) -> Vec<HistogramBin> {
    let n_bins = n_bins.max(1);
    let bins = n_bins as f64;
    let mut counts = vec![0usize; n_bins];
    for &v in values {
        // fractions that sit on an edge (k/n) belong to the bin starting there
        let scaled = v * bins;
        let nearest = scaled.round();
        let index = if (scaled - nearest).abs() < 1e-9 {
            nearest
        } else {
            scaled.floor()
        };
        let bin = (index.max(0.0) as usize).min(n_bins - 1);
        counts[bin] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: i as f64 / bins,
            upper: (i + 1) as f64 / bins,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NA: f64 = f64::NAN;

    fn create_test_matrix() -> AbundanceMatrix {
        // 3 proteins × 4 samples: 0%, 50%, 100% missing
        let values = [
            1.0, 2.0, 3.0, 4.0, //
            5.0, NA, 7.0, NA, //
            NA, NA, NA, NA,
        ];
        let protein_ids = vec!["A".into(), "B".into(), "C".into()];
        let sample_ids = vec!["S1".into(), "S2".into(), "S3".into(), "S4".into()];
        AbundanceMatrix::from_row_slice(3, 4, &values, protein_ids, sample_ids).unwrap()
    }

    #[test]
    fn test_compute_missingness_exact() {
        let matrix = create_test_matrix();
        let missingness = compute_missingness(&matrix).unwrap();

        assert_eq!(missingness.len(), 3);
        assert_eq!(missingness.values, vec![0.0, 0.5, 1.0]);
        assert_eq!(missingness.protein_ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_compute_missingness_zero_samples() {
        let matrix = AbundanceMatrix::from_row_slice(2, 0, &[], vec!["A".into(), "B".into()], vec![])
            .unwrap();
        assert!(matches!(
            compute_missingness(&matrix),
            Err(ImputeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_profile_missingness() {
        let matrix = create_test_matrix();
        let profile = profile_missingness(&matrix, 4).unwrap();

        assert_eq!(profile.total_entries, 12);
        assert_eq!(profile.missing_entries, 6);
        assert!((profile.missingness - 0.5).abs() < 1e-10);
        assert_eq!(profile.sample_missingness, vec![1.0 / 3.0, 2.0 / 3.0, 1.0 / 3.0, 2.0 / 3.0]);
        assert_eq!(profile.n_complete_proteins, 1);
        assert_eq!(profile.n_empty_proteins, 1);
        assert_eq!(profile.n_above(0.2), 2);
        assert!((profile.median_protein_missingness - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_histogram_edges() {
        let matrix = create_test_matrix();
        let missingness = compute_missingness(&matrix).unwrap();
        let hist = missingness.histogram(4);

        assert_eq!(hist.len(), 4);
        // 0.0 -> bin 0, 0.5 -> bin 2, 1.0 -> last bin (closed)
        let counts: Vec<usize> = hist.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 0, 1, 1]);
        assert_eq!(hist[3].upper, 1.0);
    }

    #[test]
    fn test_histogram_interior_edges() {
        for n in 1..=12usize {
            let fractions: Vec<f64> = (0..=n).map(|k| k as f64 / n as f64).collect();
            let counts: Vec<usize> = missingness_histogram(&fractions, n)
                .iter()
                .map(|b| b.count)
                .collect();
            let mut expected = vec![1usize; n];
            expected[n - 1] += 1;
            assert_eq!(counts, expected, "{} bins", n);
        }
    }

    #[test]
    fn test_histogram_three_of_five_missing() {
        // 10 proteins × 5 samples, protein 0 missing in samples 0-2
        let mut values = vec![1.0; 50];
        for v in values.iter_mut().take(3) {
            *v = NA;
        }
        let protein_ids = (0..10).map(|i| format!("P{}", i)).collect();
        let sample_ids = (0..5).map(|j| format!("S{}", j)).collect();
        let matrix =
            AbundanceMatrix::from_row_slice(10, 5, &values, protein_ids, sample_ids).unwrap();
        let hist = compute_missingness(&matrix).unwrap().histogram(5);

        let counts: Vec<usize> = hist.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![9, 0, 0, 1, 0]);
        assert_eq!(hist[3].lower, 3.0 / 5.0);
        assert_eq!(hist[2].upper, hist[3].lower);
    }

    #[test]
    fn test_indices_at_or_below() {
        let matrix = create_test_matrix();
        let missingness = compute_missingness(&matrix).unwrap();
        assert_eq!(missingness.indices_at_or_below(0.5), vec![0, 1]);
        assert_eq!(missingness.indices_at_or_below(0.0), vec![0]);
    }
}
