//! Filtering primitives for abundance matrices.

pub mod missingness;

pub use missingness::{
    filter_by_threshold, filter_by_threshold_with_stats, FilterResult,
    DEFAULT_MISSINGNESS_THRESHOLD,
};
