//! Comma-separated tables.

use std::path::Path;

use csv::{ReaderBuilder, Trim};

use super::{Cell, RawTable};
use crate::error::{ForecastError, Result};

/// Read a CSV file; the first record is the header.
pub(crate) fn read(path: &Path) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| ForecastError::DataFormat(format!("cannot read {}: {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| ForecastError::DataFormat(format!("cannot read header: {}", e)))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| ForecastError::DataFormat(format!("malformed record: {}", e)))?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(RawTable { headers, rows })
}
