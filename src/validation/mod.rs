//! Statistical tests used for differencing selection and fit diagnostics.

pub mod residual_tests;
pub mod stationarity;

pub use residual_tests::{ljung_box, LjungBoxResult};
pub use stationarity::{kpss_test, ndiffs, StationarityResult};
