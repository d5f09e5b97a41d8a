//! Loading annual tables from spreadsheets and delimited files.
//!
//! The first row is the header. One column holds the year; every other
//! column must be numeric. Rows are sorted by year and the years must be
//! contiguous, producing a year-start [`TimeSeries`] with one labelled
//! column per non-year column.

mod delimited;
mod spreadsheet;

use std::fmt;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use crate::core::{year_start, Frequency, TimeSeries, ValueLayout};
use crate::error::{ForecastError, Result};

/// Options controlling how a table is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Worksheet to read from spreadsheet files.
    pub sheet: String,
    /// Header of the column holding the year.
    pub year_column: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            sheet: "Sheet1".to_string(),
            year_column: "年份".to_string(),
        }
    }
}

impl LoadOptions {
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = sheet.into();
        self
    }

    pub fn with_year_column(mut self, year_column: impl Into<String>) -> Self {
        self.year_column = year_column.into();
        self
    }
}

/// A cell as read from the source file, before interpretation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    Number(f64),
    Text(String),
    Date(NaiveDate),
    Empty,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
            Cell::Date(d) => write!(f, "{}", d),
            Cell::Empty => f.write_str(""),
        }
    }
}

/// Header plus data rows of a source table.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Load an annual table.
///
/// `.xlsx`, `.xlsm`, `.xls`, `.xlsb` and `.ods` files are read from
/// `options.sheet`; `.csv` files are read whole.
///
/// # Errors
///
/// - [`ForecastError::MissingFile`] if `path` does not exist.
/// - [`ForecastError::DataFormat`] for an unsupported extension, a missing
///   or unparseable year column, non-numeric or empty cells, duplicate
///   years, or gaps between years.
pub fn load_table<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<TimeSeries> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ForecastError::MissingFile(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let raw = match extension.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => spreadsheet::read(path, &options.sheet)?,
        "csv" => delimited::read(path)?,
        other => {
            return Err(ForecastError::DataFormat(format!(
                "unsupported file type '{}' for {}",
                other,
                path.display()
            )))
        }
    };
    debug!(
        path = %path.display(),
        columns = raw.headers.len(),
        rows = raw.rows.len(),
        "read raw table"
    );

    let table = build_table(raw, &options.year_column)?;
    info!(
        path = %path.display(),
        years = table.len(),
        columns = table.dimensions(),
        "loaded table"
    );
    Ok(table)
}

pub(crate) fn build_table(raw: RawTable, year_column: &str) -> Result<TimeSeries> {
    let RawTable { headers, rows } = raw;

    let year_idx = headers
        .iter()
        .position(|h| h == year_column)
        .ok_or_else(|| {
            ForecastError::DataFormat(format!("year column '{}' not found", year_column))
        })?;

    let value_columns: Vec<(usize, &String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != year_idx)
        .collect();
    for (i, (_, name)) in value_columns.iter().enumerate() {
        if name.is_empty() {
            return Err(ForecastError::DataFormat(format!(
                "column {} has an empty header",
                i + 1
            )));
        }
        if value_columns[..i].iter().any(|(_, other)| other == name) {
            return Err(ForecastError::DataFormat(format!(
                "duplicate column '{}'",
                name
            )));
        }
    }

    let mut records: Vec<(i32, Vec<f64>)> = Vec::with_capacity(rows.len());
    for (row_no, row) in rows.iter().enumerate() {
        if row.iter().all(|c| *c == Cell::Empty) {
            continue;
        }
        let year_cell = row.get(year_idx).unwrap_or(&Cell::Empty);
        let year = parse_year(year_cell).ok_or_else(|| {
            ForecastError::DataFormat(format!(
                "row {}: cannot read a year from '{}'",
                row_no + 2,
                year_cell
            ))
        })?;

        let values = value_columns
            .iter()
            .map(|(col, name)| parse_value(row.get(*col).unwrap_or(&Cell::Empty), name, year))
            .collect::<Result<Vec<_>>>()?;
        records.push((year, values));
    }

    if records.is_empty() {
        return Err(ForecastError::DataFormat("table has no data rows".to_string()));
    }

    records.sort_by_key(|(year, _)| *year);
    for pair in records.windows(2) {
        let (prev, next) = (pair[0].0, pair[1].0);
        if prev == next {
            return Err(ForecastError::DataFormat(format!("duplicate year {}", prev)));
        }
        if next - prev != 1 {
            return Err(ForecastError::DataFormat(format!(
                "years are not contiguous: {} is followed by {}",
                prev, next
            )));
        }
    }

    let timestamps = records
        .iter()
        .map(|(year, _)| year_start(*year))
        .collect::<Result<Vec<_>>>()?;
    let row_major: Vec<Vec<f64>> = records.into_iter().map(|(_, values)| values).collect();
    let labels: Vec<String> = value_columns.iter().map(|(_, name)| (*name).clone()).collect();

    if labels.is_empty() {
        return Err(ForecastError::DataFormat(
            "table has no value columns".to_string(),
        ));
    }

    TimeSeries::new(
        timestamps,
        row_major,
        ValueLayout::Row,
        labels,
        Some(Frequency::YearStart),
    )
}

/// Four-digit year from a number, text (`"2010"`, `"2010.0"`,
/// `"2010-01-01"`) or date cell.
fn parse_year(cell: &Cell) -> Option<i32> {
    let year = match cell {
        Cell::Number(v) => year_from_number(*v)?,
        Cell::Date(d) => d.year(),
        Cell::Text(s) => {
            let s = s.trim();
            match s.parse::<f64>() {
                Ok(v) => year_from_number(v)?,
                Err(_) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?.year(),
            }
        }
        Cell::Empty => return None,
    };
    (1000..=9999).contains(&year).then_some(year)
}

fn year_from_number(v: f64) -> Option<i32> {
    (v.is_finite() && v.fract() == 0.0 && v.abs() < i32::MAX as f64).then_some(v as i32)
}

fn parse_value(cell: &Cell, column: &str, year: i32) -> Result<f64> {
    let value = match cell {
        Cell::Number(v) => Some(*v),
        Cell::Text(s) => s.trim().parse::<f64>().ok(),
        Cell::Empty => {
            return Err(ForecastError::DataFormat(format!(
                "column '{}' has no value for {}",
                column, year
            )))
        }
        Cell::Date(_) => None,
    };
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(ForecastError::DataFormat(format!(
            "column '{}' has non-numeric value '{}' for {}",
            column, cell, year
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn raw(headers: &[&str], rows: Vec<Vec<Cell>>) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn t(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn build_table_sorts_years() {
        let table = build_table(
            raw(
                &["年份", "a", "b"],
                vec![
                    vec![n(2002.0), n(3.0), n(30.0)],
                    vec![n(2000.0), n(1.0), n(10.0)],
                    vec![n(2001.0), n(2.0), n(20.0)],
                ],
            ),
            "年份",
        )
        .unwrap();

        assert_eq!(table.years(), vec![2000, 2001, 2002]);
        assert_eq!(table.labels(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.column("a").unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(table.column("b").unwrap(), &[10.0, 20.0, 30.0]);
        assert_eq!(table.frequency(), Some(Frequency::YearStart));
    }

    #[test]
    fn year_column_can_sit_anywhere() {
        let table = build_table(
            raw(
                &["a", "year"],
                vec![vec![n(1.0), t("1999")], vec![n(2.0), t("2000-01-01")]],
            ),
            "year",
        )
        .unwrap();
        assert_eq!(table.years(), vec![1999, 2000]);
        assert_eq!(table.labels(), &["a".to_string()]);
    }

    #[test]
    fn parse_year_accepts_common_forms() {
        assert_eq!(parse_year(&n(2010.0)), Some(2010));
        assert_eq!(parse_year(&t(" 2010 ")), Some(2010));
        assert_eq!(parse_year(&t("2010.0")), Some(2010));
        assert_eq!(
            parse_year(&Cell::Date(NaiveDate::from_ymd_opt(2010, 1, 1).unwrap())),
            Some(2010)
        );
        assert_eq!(parse_year(&n(2010.5)), None);
        assert_eq!(parse_year(&n(10.0)), None);
        assert_eq!(parse_year(&t("twenty ten")), None);
        assert_eq!(parse_year(&Cell::Empty), None);
    }

    #[test]
    fn missing_year_column_is_a_format_error() {
        let err = build_table(raw(&["a"], vec![vec![n(1.0)]]), "年份").unwrap_err();
        assert!(matches!(err, ForecastError::DataFormat(_)));
    }

    #[test]
    fn duplicate_year_is_a_format_error() {
        let err = build_table(
            raw(
                &["年份", "a"],
                vec![vec![n(2000.0), n(1.0)], vec![n(2000.0), n(2.0)]],
            ),
            "年份",
        )
        .unwrap_err();
        assert_eq!(err, ForecastError::DataFormat("duplicate year 2000".to_string()));
    }

    #[test]
    fn gap_between_years_is_a_format_error() {
        let err = build_table(
            raw(
                &["年份", "a"],
                vec![vec![n(2000.0), n(1.0)], vec![n(2002.0), n(2.0)]],
            ),
            "年份",
        )
        .unwrap_err();
        assert!(matches!(err, ForecastError::DataFormat(msg) if msg.contains("not contiguous")));
    }

    #[test]
    fn non_numeric_and_empty_cells_are_format_errors() {
        let err = build_table(
            raw(&["年份", "a"], vec![vec![n(2000.0), t("n/a")]]),
            "年份",
        )
        .unwrap_err();
        assert!(matches!(err, ForecastError::DataFormat(msg) if msg.contains("'a'")));

        let err = build_table(
            raw(&["年份", "a"], vec![vec![n(2000.0), Cell::Empty]]),
            "年份",
        )
        .unwrap_err();
        assert!(matches!(err, ForecastError::DataFormat(_)));
    }

    #[test]
    fn blank_rows_are_skipped() {
        let table = build_table(
            raw(
                &["年份", "a"],
                vec![
                    vec![n(2000.0), n(1.0)],
                    vec![Cell::Empty, Cell::Empty],
                    vec![n(2001.0), t("2.5")],
                ],
            ),
            "年份",
        )
        .unwrap();
        assert_eq!(table.column("a").unwrap(), &[1.0, 2.5]);
    }

    #[test]
    fn duplicate_headers_are_rejected() {
        let err = build_table(
            raw(&["年份", "a", "a"], vec![vec![n(2000.0), n(1.0), n(2.0)]]),
            "年份",
        )
        .unwrap_err();
        assert!(matches!(err, ForecastError::DataFormat(_)));
    }

    #[test]
    fn load_table_missing_file() {
        let err = load_table("/definitely/not/here.xlsx", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ForecastError::MissingFile(_)));
    }

    #[test]
    fn load_table_unsupported_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, "{{}}").unwrap();
        let err = load_table(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ForecastError::DataFormat(_)));
    }

    #[test]
    fn load_table_reads_csv() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "年份,学校数,教师数").unwrap();
        writeln!(file, "2001,12,300").unwrap();
        writeln!(file, "2000,10,280").unwrap();
        writeln!(file, "2002,13,310.5").unwrap();

        let table = load_table(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(table.years(), vec![2000, 2001, 2002]);
        assert_eq!(table.column("教师数").unwrap(), &[280.0, 300.0, 310.5]);
    }

    #[test]
    fn load_options_builders() {
        let options = LoadOptions::default()
            .with_sheet("Data")
            .with_year_column("year");
        assert_eq!(options.sheet, "Data");
        assert_eq!(options.year_column, "year");
        assert_eq!(LoadOptions::default().sheet, "Sheet1");
    }
}
