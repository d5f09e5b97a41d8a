//! # enrollment-forecast
//!
//! Five-year forecasts of higher-education enrollment from a short annual
//! table.
//!
//! Each covariate (school, teacher and admission counts) is forecast on its
//! own with an automatically selected ARIMA model. The target is then fitted
//! as a regression with ARIMA errors on the historical covariates and
//! forecast from the covariate forecasts, with a prediction interval. Results
//! are written as a CSV table and a multi-panel PNG chart.
//!
//! ```no_run
//! use enrollment_forecast::prelude::*;
//!
//! let config = PipelineConfig::new("Data3.xlsx");
//! let output = Pipeline::new(config).run()?;
//! println!("{:?}", output.forecast.primary());
//! # Ok::<(), PipelineError>(())
//! ```

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::core::{Forecast, TimeSeries};
    pub use crate::error::{ForecastError, Result};
    pub use crate::io::{load_table, LoadOptions};
    pub use crate::models::arima::{AutoARIMA, AutoARIMAConfig, InformationCriterion, ARIMA};
    pub use crate::models::Forecaster;
    pub use crate::pipeline::{Pipeline, PipelineError, PipelineOutput, Stage};
    pub use crate::report::ChartConfig;
    pub use crate::utils::quantile_normal;
}
