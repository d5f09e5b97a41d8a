//! ARIMA (Autoregressive Integrated Moving Average) models.
//!
//! This module provides:
//! - ARIMA models with optional exogenous regressors (regression with ARIMA errors)
//! - AutoARIMA for automatic order selection

mod auto_arima;
mod diff;
mod model;

pub use auto_arima::{AutoARIMA, AutoARIMAConfig, InformationCriterion, ModelOrder};
pub use diff::{difference, difference_continuation, integrate};
pub use model::{ARIMASpec, ARIMA};
