//! TimeSeries data structure for annual tabular data.

use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};

/// Layout of multivariate data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueLayout {
    /// Each inner vector is a dimension (column-major).
    #[default]
    Column,
    /// Each inner vector is an observation across dimensions (row-major).
    Row,
}

/// Sampling frequency of a time index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// One observation per calendar year, stamped on January 1.
    YearStart,
}

impl Frequency {
    /// Move `date` forward by `steps` periods.
    pub fn advance(&self, date: NaiveDate, steps: i32) -> Result<NaiveDate> {
        match self {
            Frequency::YearStart => year_start(date.year() + steps),
        }
    }

    /// Check that every timestamp sits on the grid and consecutive
    /// timestamps are exactly one period apart.
    pub fn is_regular(&self, timestamps: &[NaiveDate]) -> bool {
        match self {
            Frequency::YearStart => {
                timestamps.iter().all(|t| t.month() == 1 && t.day() == 1)
                    && timestamps.windows(2).all(|w| w[1].year() - w[0].year() == 1)
            }
        }
    }

    /// Infer the frequency of a timestamp sequence.
    pub fn infer(timestamps: &[NaiveDate]) -> Result<Frequency> {
        if timestamps.len() < 2 {
            return Err(ForecastError::InsufficientData {
                needed: 2,
                got: timestamps.len(),
            });
        }
        if Frequency::YearStart.is_regular(timestamps) {
            Ok(Frequency::YearStart)
        } else {
            Err(ForecastError::TimestampError(
                "timestamps are not evenly spaced year starts".to_string(),
            ))
        }
    }
}

/// January 1 of `year`.
pub fn year_start(year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| ForecastError::TimestampError(format!("year {} is out of range", year)))
}

/// An ordered, labelled collection of series sharing one time index.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<NaiveDate>,
    /// Values stored in column-major format: values[dimension][observation]
    values: Vec<Vec<f64>>,
    labels: Vec<String>,
    frequency: Option<Frequency>,
}

/// Builder for constructing TimeSeries.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesBuilder {
    timestamps: Vec<NaiveDate>,
    values: Vec<Vec<f64>>,
    layout: ValueLayout,
    labels: Vec<String>,
    frequency: Option<Frequency>,
}

impl TimeSeriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamps(mut self, timestamps: Vec<NaiveDate>) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Set univariate values.
    pub fn values(mut self, values: Vec<f64>) -> Self {
        self.values = vec![values];
        self.layout = ValueLayout::Column;
        self
    }

    /// Set multivariate values with specified layout.
    pub fn multivariate_values(mut self, values: Vec<Vec<f64>>, layout: ValueLayout) -> Self {
        self.values = values;
        self.layout = layout;
        self
    }

    pub fn labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn frequency(mut self, freq: Frequency) -> Self {
        self.frequency = Some(freq);
        self
    }

    pub fn build(self) -> Result<TimeSeries> {
        TimeSeries::new(
            self.timestamps,
            self.values,
            self.layout,
            self.labels,
            self.frequency,
        )
    }
}

impl TimeSeries {
    /// Create a new TimeSeries, validating the index and dimensions.
    pub fn new(
        timestamps: Vec<NaiveDate>,
        values: Vec<Vec<f64>>,
        layout: ValueLayout,
        labels: Vec<String>,
        frequency: Option<Frequency>,
    ) -> Result<Self> {
        for i in 1..timestamps.len() {
            if timestamps[i] <= timestamps[i - 1] {
                return Err(ForecastError::TimestampError(
                    "timestamps must be strictly increasing".to_string(),
                ));
            }
        }

        if let Some(freq) = frequency {
            if !freq.is_regular(&timestamps) {
                return Err(ForecastError::TimestampError(format!(
                    "timestamps do not follow {:?} frequency",
                    freq
                )));
            }
        }

        let values = match layout {
            ValueLayout::Column => {
                for series in &values {
                    if series.len() != timestamps.len() {
                        return Err(ForecastError::DimensionMismatch {
                            expected: timestamps.len(),
                            got: series.len(),
                        });
                    }
                }
                values
            }
            ValueLayout::Row => {
                if values.len() != timestamps.len() {
                    return Err(ForecastError::DimensionMismatch {
                        expected: timestamps.len(),
                        got: values.len(),
                    });
                }

                let dims = values.first().map(|row| row.len()).unwrap_or(0);
                for row in &values {
                    if row.len() != dims {
                        return Err(ForecastError::DimensionMismatch {
                            expected: dims,
                            got: row.len(),
                        });
                    }
                }

                (0..dims)
                    .map(|d| values.iter().map(|row| row[d]).collect())
                    .collect()
            }
        };

        if !labels.is_empty() && labels.len() != values.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: values.len(),
                got: labels.len(),
            });
        }

        Ok(Self {
            timestamps,
            values,
            labels,
            frequency,
        })
    }

    /// Create a simple univariate time series without a declared frequency.
    pub fn univariate(timestamps: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        Self::new(timestamps, vec![values], ValueLayout::Column, vec![], None)
    }

    /// Create a labelled year-start series for consecutive years beginning at `first_year`.
    pub fn annual(first_year: i32, columns: Vec<Vec<f64>>, labels: Vec<String>) -> Result<Self> {
        let n = columns.first().map(|c| c.len()).unwrap_or(0);
        let timestamps = (0..n as i32)
            .map(|i| year_start(first_year + i))
            .collect::<Result<Vec<_>>>()?;
        Self::new(
            timestamps,
            columns,
            ValueLayout::Column,
            labels,
            Some(Frequency::YearStart),
        )
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the series is empty.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Get the number of dimensions (1 for univariate).
    pub fn dimensions(&self) -> usize {
        self.values.len()
    }

    /// Check if the series is multivariate.
    pub fn is_multivariate(&self) -> bool {
        self.values.len() > 1
    }

    /// Get timestamps.
    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    /// Calendar year of every observation.
    pub fn years(&self) -> Vec<i32> {
        self.timestamps.iter().map(|t| t.year()).collect()
    }

    /// Last timestamp of the index.
    pub fn last_timestamp(&self) -> Option<NaiveDate> {
        self.timestamps.last().copied()
    }

    /// Get values for a specific dimension.
    pub fn values(&self, dimension: usize) -> Result<&[f64]> {
        self.values
            .get(dimension)
            .map(|v| v.as_slice())
            .ok_or(ForecastError::IndexOutOfBounds {
                index: dimension,
                size: self.values.len(),
            })
    }

    /// Get primary (first dimension) values.
    pub fn primary_values(&self) -> &[f64] {
        self.values.first().map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Get all values organized by dimension.
    pub fn values_by_dimension(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Get dimension labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Position of the column labelled `name`.
    pub fn label_position(&self, name: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == name)
    }

    /// Values of the column labelled `name`.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        let idx = self
            .label_position(name)
            .ok_or_else(|| ForecastError::InvalidParameter(format!("no column named '{}'", name)))?;
        self.values(idx)
    }

    /// Build a new series holding only the named columns, in the given order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<TimeSeries> {
        let mut values = Vec::with_capacity(names.len());
        let mut labels = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            values.push(self.column(name)?.to_vec());
            labels.push(name.to_string());
        }
        Ok(TimeSeries {
            timestamps: self.timestamps.clone(),
            values,
            labels,
            frequency: self.frequency,
        })
    }

    /// Get frequency.
    pub fn frequency(&self) -> Option<Frequency> {
        self.frequency
    }

    /// Set frequency after checking the index conforms to it.
    pub fn set_frequency(&mut self, freq: Frequency) -> Result<()> {
        if !freq.is_regular(&self.timestamps) {
            return Err(ForecastError::TimestampError(format!(
                "timestamps do not follow {:?} frequency",
                freq
            )));
        }
        self.frequency = Some(freq);
        Ok(())
    }

    /// The `horizon` timestamps immediately following the last observation.
    pub fn future_timestamps(&self, horizon: usize) -> Result<Vec<NaiveDate>> {
        let last = self.last_timestamp().ok_or(ForecastError::EmptyData)?;
        let freq = match self.frequency {
            Some(freq) => freq,
            None if self.len() == 1 => Frequency::YearStart,
            None => Frequency::infer(&self.timestamps)?,
        };
        (1..=horizon as i32)
            .map(|step| freq.advance(last, step))
            .collect()
    }

    /// Check if series has missing values (NaN or Inf).
    pub fn has_missing_values(&self) -> bool {
        self.values
            .iter()
            .any(|dim| dim.iter().any(|v| !v.is_finite()))
    }
}
