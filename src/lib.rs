//! Proteomics Missing-Value Imputation Library
//!
//! This library provides modular primitives for handling missing values in
//! label-free proteomics abundance matrices: proteins are rows, samples are
//! columns, and missing quantifications are marked as NaN.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (AbundanceMatrix, ImputationEnsemble)
//! - **profile**: Missingness profiling and sample correlation
//! - **filter**: Missingness threshold filtering
//! - **test**: Little's MCAR test
//! - **impute**: Chained-equations multiple imputation (RF, CART, PMM, Norm)
//! - **normalize**: Per-sample median/MAD and scale normalization
//! - **combine**: Reduce an ensemble to one completed matrix
//! - **pipeline**: Pipeline composition and execution
//!
//! # Example
//!
//! ```no_run
//! use proteo_impute::prelude::*;
//!
//! let matrix = AbundanceMatrix::from_tsv("abundances.tsv").unwrap();
//!
//! let output = Pipeline::new()
//!     .filter_missingness(0.2)
//!     .test_mcar()
//!     .impute(ImputeMethod::Rf, 3, 5, 42)
//!     .combine(Selection::Index(0))
//!     .run(&matrix)
//!     .unwrap();
//!
//! output.completed.unwrap().to_tsv("completed.tsv").unwrap();
//! ```

pub mod combine;
pub mod data;
pub mod error;
pub mod filter;
pub mod impute;
pub mod normalize;
pub mod pipeline;
pub mod profile;
mod stats;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::combine::{combine, combine_with, CombineConfig, CompletedMatrix, Selection};
    pub use crate::data::{AbundanceMatrix, ImputationEnsemble, ImputationRun};
    pub use crate::error::{ImputeError, Result};
    pub use crate::filter::{
        filter_by_threshold, filter_by_threshold_with_stats, FilterResult,
        DEFAULT_MISSINGNESS_THRESHOLD,
    };
    pub use crate::impute::{impute, impute_with_config, ImputeConfig, ImputeMethod};
    pub use crate::normalize::{
        log2_transform, normalize_mad, normalize_scale, NormalizationMethod, NormalizedMatrix,
    };
    pub use crate::pipeline::{
        run_standard, Pipeline, PipelineConfig, PipelineOutput, PipelineStep,
    };
    pub use crate::profile::{
        compute_missingness, profile_missingness, sample_correlation, HistogramBin,
        MissingnessProfile, MissingnessVector,
    };
    pub use crate::test::{mcar_test, McarResult};
}
