//! Worksheet reading with calamine.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use super::{Cell, RawTable};
use crate::error::{ForecastError, Result};

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Int(v) => Cell::Number(*v as f64),
            Data::Float(v) => Cell::Number(*v),
            Data::String(s) => Cell::Text(s.clone()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(dt) => Cell::Date(dt.date()),
                None => Cell::Text(data.to_string()),
            },
            Data::DateTimeIso(s) => Cell::Text(s.clone()),
            Data::Empty => Cell::Empty,
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Read `sheet` from a workbook; the first row is the header.
pub(crate) fn read(path: &Path, sheet: &str) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        ForecastError::DataFormat(format!("cannot open workbook {}: {}", path.display(), e))
    })?;
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| ForecastError::DataFormat(format!("cannot read sheet '{}': {}", sheet, e)))?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .ok_or_else(|| ForecastError::DataFormat(format!("sheet '{}' is empty", sheet)))?
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();
    let rows = rows
        .map(|row| row.iter().map(Cell::from).collect())
        .collect();

    Ok(RawTable { headers, rows })
}
