//! The final completed, normalized matrix.

use super::Selection;
use crate::data::write_table;
use crate::error::Result;
use crate::normalize::NormalizationMethod;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A missing-value-free matrix ready for downstream analysis.
///
/// Values may be negative (after normalization or log transformation), so
/// this is kept separate from [`AbundanceMatrix`](crate::data::AbundanceMatrix).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedMatrix {
    /// Completed data (proteins × samples).
    pub data: DMatrix<f64>,
    /// Protein identifiers (row names).
    pub protein_ids: Vec<String>,
    /// Sample identifiers (column names).
    pub sample_ids: Vec<String>,
    /// How the ensemble member(s) were chosen.
    pub selection: Selection,
    /// Normalization applied.
    pub normalization: NormalizationMethod,
    /// Whether values were log2 transformed before normalization.
    pub log2: bool,
    /// Per-sample centers before normalization.
    pub centers: Vec<f64>,
    /// Per-sample spreads before normalization.
    pub spreads: Vec<f64>,
    /// Common center after normalization.
    pub reference_center: f64,
    /// Common spread after normalization.
    pub reference_spread: f64,
}

impl CompletedMatrix {
    /// Value at (protein, sample); panics if either index is out of bounds.
    pub fn get(&self, protein: usize, sample: usize) -> f64 {
        self.data[(protein, sample)]
    }

    /// Number of proteins (rows).
    pub fn n_proteins(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples (columns).
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Column index of a sample by identifier.
    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|s| s == sample_id)
    }

    /// Write as a tab-separated table with a protein id column.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_table(path, &self.data, &self.protein_ids, &self.sample_ids)
    }
}
