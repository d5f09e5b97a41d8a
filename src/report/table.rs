//! Forecast tables written with the csv crate.

use std::path::Path;

use csv::Writer;
use tracing::info;

use crate::core::Forecast;
use crate::error::{ForecastError, Result};

/// Write point forecasts as `date,value` rows under the header `,<header>`.
///
/// The index column is unlabeled and dates are written as `YYYY-MM-DD`.
/// An existing file is overwritten.
pub fn write_forecast_csv<P: AsRef<Path>>(path: P, forecast: &Forecast, header: &str) -> Result<()> {
    let path = path.as_ref();
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["", header])?;
    for row in forecast.rows()? {
        writer.write_record([
            row.timestamp.format("%Y-%m-%d").to_string(),
            row.point.to_string(),
        ])?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = forecast.horizon(), "wrote forecast table");
    Ok(())
}

/// Like [`write_forecast_csv`], with `lower` and `upper` interval columns.
pub fn write_forecast_table_csv<P: AsRef<Path>>(
    path: P,
    forecast: &Forecast,
    header: &str,
) -> Result<()> {
    let path = path.as_ref();
    if !forecast.has_lower() || !forecast.has_upper() {
        return Err(ForecastError::InvalidParameter(
            "forecast has no prediction interval".to_string(),
        ));
    }

    let mut writer = Writer::from_path(path)?;
    writer.write_record(["", header, "lower", "upper"])?;
    for row in forecast.rows()? {
        writer.write_record([
            row.timestamp.format("%Y-%m-%d").to_string(),
            row.point.to_string(),
            row.lower.map(|v| v.to_string()).unwrap_or_default(),
            row.upper.map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = forecast.horizon(), "wrote forecast table with intervals");
    Ok(())
}
