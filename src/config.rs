//! Pipeline configuration.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{ForecastError, Result};
use crate::io::LoadOptions;
use crate::models::arima::AutoARIMAConfig;
use crate::report::ChartConfig;

/// Everything the forecasting pipeline needs to know.
///
/// `Default` reproduces the enrollment analysis: higher-education enrollment
/// forecast five years ahead from school, teacher and admission counts.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Input spreadsheet or CSV file.
    pub input: PathBuf,
    pub load: LoadOptions,
    /// Column forecast with regressors.
    pub target: String,
    /// Covariate columns, each forecast on its own and used as regressors.
    pub exog: Vec<String>,
    pub horizon: usize,
    /// Coverage of the target's prediction interval.
    pub level: f64,
    /// Order search settings, shared by every series.
    pub search: AutoARIMAConfig,
    pub csv_output: PathBuf,
    /// Header of the forecast column in the CSV output.
    pub csv_header: String,
    /// Write `lower`/`upper` columns to the CSV output.
    pub with_intervals: bool,
    /// Chart output; no chart is drawn when `None`.
    pub chart_output: Option<PathBuf>,
    pub chart: ChartConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("Data3.xlsx"),
            load: LoadOptions::default(),
            target: "高等教育阶段在校生数".to_string(),
            exog: vec![
                "高等教育阶段学校数".to_string(),
                "高等教育阶段教师数".to_string(),
                "高等教育阶段招生人数".to_string(),
            ],
            horizon: 5,
            level: 0.95,
            search: AutoARIMAConfig::default(),
            csv_output: PathBuf::from("forecast_results2.csv"),
            csv_header: "预测值".to_string(),
            with_intervals: false,
            chart_output: Some(PathBuf::from("all_columns_forecast2.png")),
            chart: ChartConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_load_options(mut self, load: LoadOptions) -> Self {
        self.load = load;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_exog<S: Into<String>>(mut self, exog: impl IntoIterator<Item = S>) -> Self {
        self.exog = exog.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_level(mut self, level: f64) -> Self {
        self.level = level;
        self
    }

    pub fn with_search(mut self, search: AutoARIMAConfig) -> Self {
        self.search = search;
        self
    }

    pub fn with_csv_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_output = path.into();
        self
    }

    pub fn with_intervals(mut self, with_intervals: bool) -> Self {
        self.with_intervals = with_intervals;
        self
    }

    pub fn with_chart_output(mut self, path: Option<PathBuf>) -> Self {
        self.chart_output = path;
        self
    }

    pub fn with_chart(mut self, chart: ChartConfig) -> Self {
        self.chart = chart;
        self
    }

    /// Check the settings that do not depend on the input data.
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be at least 1".to_string(),
            ));
        }
        if !(self.level > 0.0 && self.level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "confidence level must be in (0, 1), got {}",
                self.level
            )));
        }
        if self.exog.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "at least one covariate is required".to_string(),
            ));
        }
        if self.exog.contains(&self.target) {
            return Err(ForecastError::InvalidParameter(format!(
                "target '{}' cannot also be a covariate",
                self.target
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.exog.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(ForecastError::InvalidParameter(format!(
                "covariate '{}' is listed twice",
                dup
            )));
        }
        if self.chart.font_families.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "at least one chart font family is required".to_string(),
            ));
        }
        if self.chart.dpi == 0 {
            return Err(ForecastError::InvalidParameter(
                "chart dpi must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
