//! Forecaster trait defining the common interface for all models.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};

/// Common interface for all forecasting models.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
/// Models that accept exogenous regressors override the `*_exog` methods;
/// the defaults reject regressors.
pub trait Forecaster {
    /// Fit the model to the time series data.
    fn fit(&mut self, series: &TimeSeries) -> Result<()>;

    /// Generate predictions for the specified horizon.
    fn predict(&self, horizon: usize) -> Result<Forecast>;

    /// Generate predictions with confidence intervals.
    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        // Default implementation just returns point predictions
        let _ = level;
        self.predict(horizon)
    }

    /// Fit the model with exogenous regressors aligned to `series`.
    fn fit_with_exog(&mut self, series: &TimeSeries, exog: &TimeSeries) -> Result<()> {
        let _ = (series, exog);
        Err(ForecastError::InvalidParameter(format!(
            "{} does not support exogenous regressors",
            self.name()
        )))
    }

    /// Generate predictions from future regressor values.
    fn predict_with_exog(&self, horizon: usize, future: &TimeSeries) -> Result<Forecast> {
        let _ = (horizon, future);
        Err(ForecastError::InvalidParameter(format!(
            "{} does not support exogenous regressors",
            self.name()
        )))
    }

    /// Generate predictions with confidence intervals from future regressor values.
    fn predict_with_exog_intervals(
        &self,
        horizon: usize,
        future: &TimeSeries,
        level: f64,
    ) -> Result<Forecast> {
        let _ = level;
        self.predict_with_exog(horizon, future)
    }

    /// Whether the model can be fitted with exogenous regressors.
    fn supports_exog(&self) -> bool {
        false
    }

    /// Whether the fitted model uses exogenous regressors.
    fn has_exog(&self) -> bool {
        false
    }

    /// Names of the regressors the model was fitted with.
    fn exog_names(&self) -> Option<&[String]> {
        None
    }

    /// Get the fitted values (in-sample predictions).
    fn fitted_values(&self) -> Option<&[f64]>;

    /// Get the residuals (actual - fitted).
    fn residuals(&self) -> Option<&[f64]>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}
