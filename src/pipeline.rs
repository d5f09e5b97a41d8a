//! End-to-end enrollment forecast.
//!
//! Stages run in order: load the table, forecast each covariate with
//! AutoARIMA, build the future index, fit the target as a regression with
//! ARIMA errors, forecast it with intervals, then write the table and
//! chart. Every failure is tagged with the [`Stage`] it happened in.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::core::{Forecast, Frequency, TimeSeries, ValueLayout};
use crate::error::{ForecastError, Result};
use crate::io::load_table;
use crate::models::arima::{AutoARIMA, AutoARIMAConfig, ModelOrder, ARIMA};
use crate::models::Forecaster;
use crate::report::{build_panels, render_chart, write_forecast_csv, write_forecast_table_csv};
use crate::validation::{ljung_box, LjungBoxResult};

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    ExogenousForecast,
    FutureIndex,
    TargetFit,
    Forecast,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::ExogenousForecast => "exogenous forecast",
            Stage::FutureIndex => "future index",
            Stage::TargetFit => "target fit",
            Stage::Forecast => "forecast",
            Stage::Report => "report",
        };
        f.write_str(name)
    }
}

/// A [`ForecastError`] tagged with the stage that produced it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{stage} stage failed: {error}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub error: ForecastError,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, PipelineError>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, PipelineError> {
        self.map_err(|error| PipelineError { stage, error })
    }
}

/// Covariate forecasts and the order chosen for each covariate.
#[derive(Debug, Clone)]
pub struct ExogenousForecast {
    /// One column per covariate, indexed by the future timestamps.
    pub forecasts: TimeSeries,
    pub orders: Vec<(String, ModelOrder)>,
}

/// The final target model and its residual diagnostics.
#[derive(Debug, Clone)]
pub struct TargetFit {
    pub model: ARIMA,
    pub order: ModelOrder,
    pub diagnostics: LjungBoxResult,
}

/// Everything the pipeline computed before reporting.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: TimeSeries,
    pub exogenous: ExogenousForecast,
    pub future_index: Vec<NaiveDate>,
    pub target: TargetFit,
    pub forecast: Forecast,
}

/// Forecast each of `names` independently for `horizon` steps.
pub fn forecast_exogenous(
    table: &TimeSeries,
    names: &[String],
    horizon: usize,
    search: &AutoARIMAConfig,
) -> Result<ExogenousForecast> {
    let future = table.future_timestamps(horizon)?;
    let mut columns = Vec::with_capacity(names.len());
    let mut orders = Vec::with_capacity(names.len());

    for name in names {
        let series = table.select(std::slice::from_ref(name))?;
        let mut model = AutoARIMA::with_config(search.clone());
        model.fit(&series)?;
        let order = model.selected_order().ok_or(ForecastError::FitRequired)?;
        let forecast = model.predict(horizon)?;
        info!(column = %name, model = %order, constant = order.with_intercept, "forecast covariate");

        columns.push(forecast.primary().to_vec());
        orders.push((name.clone(), order));
    }

    let forecasts = TimeSeries::new(
        future,
        columns,
        ValueLayout::Column,
        names.to_vec(),
        Some(Frequency::YearStart),
    )?;
    Ok(ExogenousForecast { forecasts, orders })
}

/// Select an order for `target` with `exog` as regressors, then refit it
/// with the stationarity constraint relaxed.
pub fn fit_target(
    table: &TimeSeries,
    target: &str,
    exog: &[String],
    search: &AutoARIMAConfig,
) -> Result<TargetFit> {
    let y = table.select(&[target])?;
    let x = table.select(exog)?;

    let mut auto = AutoARIMA::with_config(search.clone());
    auto.fit_with_exog(&y, &x)?;
    let order = auto.selected_order().ok_or(ForecastError::FitRequired)?;
    info!(model = %order, constant = order.with_intercept, "selected target order");

    let mut model = ARIMA::from_spec(order.spec()).with_enforce_stationarity(false);
    model.fit_with_exog(&y, &x)?;

    let residuals = model.residuals().unwrap_or(&[]);
    let diagnostics = ljung_box(residuals, None, order.p + order.q);
    info!(
        model = %order,
        aic = model.aic().unwrap_or(f64::NAN),
        sigma2 = model.sigma2().unwrap_or(f64::NAN),
        ar = ?model.ar_coefficients(),
        ma = ?model.ma_coefficients(),
        exog = ?model.exog_coefficients(),
        ljung_box_p = diagnostics.p_value,
        "fitted target model"
    );
    if !diagnostics.is_white_noise(0.05) {
        warn!(p_value = diagnostics.p_value, "target residuals show autocorrelation");
    }

    Ok(TargetFit {
        model,
        order,
        diagnostics,
    })
}

/// Forecast the target from forecast covariates, with intervals at `level`.
pub fn forecast_target(
    model: &ARIMA,
    future_exog: &TimeSeries,
    horizon: usize,
    level: f64,
) -> Result<Forecast> {
    model.predict_with_exog_intervals(horizon, future_exog, level)
}

fn require_columns(table: &TimeSeries, config: &PipelineConfig) -> Result<()> {
    let missing: Vec<&str> = std::iter::once(&config.target)
        .chain(&config.exog)
        .filter(|name| table.label_position(name).is_none())
        .map(|s| s.as_str())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ForecastError::DataFormat(format!(
            "columns not found in table: {}",
            missing.join(", ")
        )))
    }
}

/// The configured forecasting run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage up to the target forecast; writes nothing.
    pub fn forecast(&self) -> std::result::Result<PipelineOutput, PipelineError> {
        let config = &self.config;

        config.validate().at(Stage::Load)?;
        let table = load_table(&config.input, &config.load).at(Stage::Load)?;
        self.forecast_table(table)
    }

    /// Run the modelling stages on an already loaded table.
    pub fn forecast_table(
        &self,
        table: TimeSeries,
    ) -> std::result::Result<PipelineOutput, PipelineError> {
        let config = &self.config;
        let horizon = config.horizon;

        config.validate().at(Stage::Load)?;
        require_columns(&table, config).at(Stage::Load)?;
        if table.has_missing_values() {
            return Err(ForecastError::MissingValues).at(Stage::Load);
        }

        info!(covariates = config.exog.len(), horizon, "forecasting covariates");
        let exogenous = forecast_exogenous(&table, &config.exog, horizon, &config.search)
            .at(Stage::ExogenousForecast)?;

        let future_index = table.future_timestamps(horizon).at(Stage::FutureIndex)?;
        if exogenous.forecasts.timestamps() != future_index.as_slice() {
            return Err(ForecastError::ExogMismatch(
                "covariate forecasts are not indexed by the future timestamps".to_string(),
            ))
            .at(Stage::FutureIndex);
        }
        info!(
            first = %future_index[0],
            last = %future_index[future_index.len() - 1],
            "built future index"
        );

        let target = fit_target(&table, &config.target, &config.exog, &config.search)
            .at(Stage::TargetFit)?;

        let forecast = forecast_target(&target.model, &exogenous.forecasts, horizon, config.level)
            .at(Stage::Forecast)?;
        info!(point = ?forecast.primary(), "forecast target");

        Ok(PipelineOutput {
            table,
            exogenous,
            future_index,
            target,
            forecast,
        })
    }

    /// Write the forecast table and, if configured, the chart.
    pub fn report(&self, output: &PipelineOutput) -> std::result::Result<(), PipelineError> {
        let config = &self.config;

        if config.with_intervals {
            write_forecast_table_csv(&config.csv_output, &output.forecast, &config.csv_header)
        } else {
            write_forecast_csv(&config.csv_output, &output.forecast, &config.csv_header)
        }
        .at(Stage::Report)?;

        if let Some(chart_path) = &config.chart_output {
            let panels = build_panels(
                &output.table,
                &config.target,
                &output.exogenous.forecasts,
                &output.forecast,
            )
            .at(Stage::Report)?;
            render_chart(chart_path, &panels, &config.chart).at(Stage::Report)?;
        }
        Ok(())
    }

    /// Forecast, then report.
    pub fn run(&self) -> std::result::Result<PipelineOutput, PipelineError> {
        let output = self.forecast()?;
        self.report(&output)?;
        Ok(output)
    }
}
