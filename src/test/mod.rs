//! Statistical hypothesis testing on missingness.


pub use mcar::{mcar_test, McarResult};
