//! Forecast result structure for holding predictions.

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;

/// A forecast result containing point predictions, optional intervals and
/// the future timestamps they belong to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    point: Vec<f64>,
    lower: Option<Vec<f64>>,
    upper: Option<Vec<f64>>,
    /// Coverage of the interval, e.g. 0.95.
    level: Option<f64>,
    index: Option<Vec<NaiveDate>>,
}

/// One step of an indexed forecast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRow {
    pub timestamp: NaiveDate,
    pub point: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl Forecast {
    /// Create an empty forecast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecast from point predictions.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            point: values,
            ..Self::default()
        }
    }

    /// Create a forecast with prediction intervals at coverage `level`.
    pub fn from_values_with_intervals(
        values: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        level: f64,
    ) -> Result<Self> {
        for bound in [&lower, &upper] {
            if bound.len() != values.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: values.len(),
                    got: bound.len(),
                });
            }
        }
        Ok(Self {
            point: values,
            lower: Some(lower),
            upper: Some(upper),
            level: Some(level),
            index: None,
        })
    }

    /// Attach the future timestamps; one per step.
    pub fn with_index(mut self, index: Vec<NaiveDate>) -> Result<Self> {
        if index.len() != self.point.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.point.len(),
                got: index.len(),
            });
        }
        if index.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ForecastError::TimestampError(
                "forecast index must be strictly increasing".to_string(),
            ));
        }
        self.index = Some(index);
        Ok(self)
    }

    /// Get the forecast horizon (number of steps).
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    /// Check if forecast is empty.
    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    /// Point predictions.
    pub fn primary(&self) -> &[f64] {
        &self.point
    }

    pub fn has_lower(&self) -> bool {
        self.lower.is_some()
    }

    pub fn has_upper(&self) -> bool {
        self.upper.is_some()
    }

    /// Lower interval bounds, if computed.
    pub fn lower(&self) -> Option<&[f64]> {
        self.lower.as_deref()
    }

    /// Upper interval bounds, if computed.
    pub fn upper(&self) -> Option<&[f64]> {
        self.upper.as_deref()
    }

    /// Interval coverage level, if computed.
    pub fn level(&self) -> Option<f64> {
        self.level
    }

    /// Future timestamps, if attached.
    pub fn index(&self) -> Option<&[NaiveDate]> {
        self.index.as_deref()
    }

    /// Iterate the forecast step by step with its timestamp.
    pub fn rows(&self) -> Result<Vec<ForecastRow>> {
        let index = self.index.as_ref().ok_or_else(|| {
            ForecastError::InvalidParameter("forecast has no timestamp index".to_string())
        })?;
        Ok(index
            .iter()
            .enumerate()
            .map(|(i, &timestamp)| ForecastRow {
                timestamp,
                point: self.point[i],
                lower: self.lower.as_ref().map(|l| l[i]),
                upper: self.upper.as_ref().map(|u| u[i]),
            })
            .collect())
    }
}
