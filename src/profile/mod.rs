//! Profiling primitives for understanding abundance matrix missingness.

mod correlation;
mod missingness;

pub use correlation::sample_correlation;
pub use missingness::{
    compute_missingness, profile_missingness, HistogramBin, MissingnessProfile, MissingnessVector,
};
