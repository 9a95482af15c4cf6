//! Data structures for sparsity analysis and imputation.

mod abundance_matrix;
mod ensemble;

pub(crate) use abundance_matrix::write_table;
pub use abundance_matrix::{AbundanceMatrix, MISSING_TOKENS};
pub use ensemble::{ImputationEnsemble, ImputationRun};
