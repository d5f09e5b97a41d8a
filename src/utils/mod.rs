//! Numerical utilities shared by the models.

pub mod ols;
pub mod optimization;
pub mod stats;

pub use ols::{ols_fit, OLSResult};
pub use optimization::{nelder_mead, nelder_mead_with_restarts, NelderMeadConfig, NelderMeadResult};
pub use stats::{quantile_normal, two_sided_z};
