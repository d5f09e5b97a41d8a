//! Core data structures for annual time series forecasting.

mod forecast;
mod time_series;

pub use forecast::{Forecast, ForecastRow};
pub use time_series::{year_start, Frequency, TimeSeries, TimeSeriesBuilder, ValueLayout};
