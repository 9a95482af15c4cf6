//! Ensemble of completed matrices produced by multiple imputation.

use crate::error::{ImputeError, Result};
use crate::impute::ImputeMethod;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// One completed matrix and the trace of the chain that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputationRun {
    /// Completed data (proteins × samples), no missing cells.
    pub data: DMatrix<f64>,
    /// Iterations actually run.
    pub iterations: usize,
    /// Mean absolute change of imputed cells per iteration.
    pub trace: Vec<f64>,
}

/// Ordered set of M completed matrices sharing the input's shape and identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputationEnsemble {
    /// Completed members, in seed order.
    pub members: Vec<ImputationRun>,
    /// Protein identifiers.
    pub protein_ids: Vec<String>,
    /// Sample identifiers.
    pub sample_ids: Vec<String>,
    /// Cells (row, col) that were missing in the input.
    pub imputed_cells: Vec<(usize, usize)>,
    /// Conditional model used.
    pub method: ImputeMethod,
    /// Base random seed.
    pub seed: u64,
    /// Iteration bound per member.
    pub max_iterations: usize,
}

impl ImputationEnsemble {
    /// Number of members (M).
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the ensemble has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of proteins.
    pub fn n_proteins(&self) -> usize {
        self.protein_ids.len()
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Completed matrix of member `index`.
    pub fn member(&self, index: usize) -> Result<&DMatrix<f64>> {
        self.members
            .get(index)
            .map(|run| &run.data)
            .ok_or(ImputeError::IndexOutOfRange {
                index,
                len: self.members.len(),
            })
    }

    /// Imputed values of member `index`, in `imputed_cells` order.
    ///
    /// Together with the observed values this is the input of
    /// observed-versus-imputed density and strip plots.
    pub fn imputed_values(&self, index: usize) -> Result<Vec<f64>> {
        let data = self.member(index)?;
        Ok(self
            .imputed_cells
            .iter()
            .map(|&(row, col)| data[(row, col)])
            .collect())
    }

    /// Write the ensemble as JSON.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Read an ensemble written by [`ImputationEnsemble::to_json_file`].
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let ensemble: Self = serde_json::from_reader(reader)?;
        for run in &ensemble.members {
            if run.data.shape() != (ensemble.n_proteins(), ensemble.n_samples()) {
                return Err(ImputeError::InvalidInput(
                    "ensemble member shape does not match its identifiers".to_string(),
                ));
            }
        }
        Ok(ensemble)
    }
}
