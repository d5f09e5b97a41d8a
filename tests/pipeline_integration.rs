//! End-to-end runs of the enrollment pipeline on synthetic annual tables.

use std::fs;
use std::path::Path;

use enrollment_forecast::config::PipelineConfig;
use enrollment_forecast::error::ForecastError;
use enrollment_forecast::pipeline::{Pipeline, Stage};
use enrollment_forecast::report::ChartConfig;
use simple_excel_writer::{Row, Workbook};

const TARGET: &str = "高等教育阶段在校生数";
const SCHOOLS: &str = "高等教育阶段学校数";
const TEACHERS: &str = "高等教育阶段教师数";
const ADMISSIONS: &str = "高等教育阶段招生人数";

fn noise(i: usize) -> f64 {
    ((i * 37 + 11) % 23) as f64 / 23.0 - 0.5
}

/// Twenty years of enrollment data, 2000 through 2019, one row per year.
fn enrollment_rows() -> Vec<[f64; 5]> {
    (0..20)
        .map(|i| {
            let t = i as f64;
            let schools = 2000.0 + 30.0 * t + 8.0 * noise(i);
            let teachers = 150_000.0 + 6000.0 * t + 1500.0 * noise(i + 5);
            let admissions = 500_000.0 + 25_000.0 * t + 6000.0 * noise(i + 9);
            let enrollment = 200_000.0 + 3.0 * admissions + 2.0 * teachers + 5000.0 * noise(i + 2);
            [2000.0 + t, schools, teachers, admissions, enrollment]
        })
        .collect()
}

/// Noise-free enrollment for year offset `t` from 2000.
fn linear_trend(t: f64) -> f64 {
    200_000.0 + 3.0 * (500_000.0 + 25_000.0 * t) + 2.0 * (150_000.0 + 6000.0 * t)
}

fn png_size(path: &Path) -> (u32, u32) {
    let bytes = fs::read(path).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
    let width = u32::from_be_bytes(bytes[16..20].try_into().unwrap());
    let height = u32::from_be_bytes(bytes[20..24].try_into().unwrap());
    (width, height)
}

fn header() -> [&'static str; 5] {
    ["年份", SCHOOLS, TEACHERS, ADMISSIONS, TARGET]
}

fn write_xlsx(path: &Path, rows: &[[f64; 5]]) {
    let mut workbook = Workbook::create(path.to_str().unwrap());
    let mut sheet = workbook.create_sheet("Sheet1");
    workbook
        .write_sheet(&mut sheet, |sheet_writer| {
            sheet_writer.append_row(Row::from_iter(header().iter().cloned()))?;
            for row in rows {
                sheet_writer.append_row(Row::from_iter(row.iter().cloned()))?;
            }
            Ok(())
        })
        .unwrap();
    workbook.close().unwrap();
}

fn write_csv(path: &Path, rows: &[[f64; 5]]) {
    let mut content = header().join(",");
    content.push('\n');
    for row in rows {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        content.push_str(&line.join(","));
        content.push('\n');
    }
    fs::write(path, content).unwrap();
}

fn config_in(dir: &Path, input: &Path) -> PipelineConfig {
    PipelineConfig::new(input)
        .with_csv_output(dir.join("forecast_results2.csv"))
        .with_chart_output(None)
}

#[test]
fn xlsx_pipeline_forecasts_five_years() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Data3.xlsx");
    write_xlsx(&input, &enrollment_rows());

    let config = config_in(dir.path(), &input);
    let output = Pipeline::new(config.clone()).run().unwrap();

    let forecast = &output.forecast;
    assert_eq!(forecast.horizon(), 5);
    let years: Vec<String> = output
        .future_index
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    assert_eq!(
        years,
        ["2020-01-01", "2021-01-01", "2022-01-01", "2023-01-01", "2024-01-01"]
    );

    let lower = forecast.lower().unwrap();
    let upper = forecast.upper().unwrap();
    for (i, point) in forecast.primary().iter().enumerate() {
        assert!(point.is_finite());
        assert!(lower[i] <= *point && *point <= upper[i]);
    }
    assert_eq!(output.exogenous.orders.len(), 3);
    assert!(config.csv_output.exists());
}

#[test]
fn forecast_continues_the_linear_trend() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Data3.xlsx");
    write_xlsx(&input, &enrollment_rows());

    let output = Pipeline::new(config_in(dir.path(), &input)).forecast().unwrap();
    let points = output.forecast.primary();

    for pair in points.windows(2) {
        assert!(pair[1] > pair[0], "forecast is not increasing: {:?}", points);
    }
    for (step, point) in points.iter().enumerate() {
        let expected = linear_trend(20.0 + step as f64);
        assert!(
            ((point - expected) / expected).abs() < 0.03,
            "step {}: {} vs trend {}",
            step,
            point,
            expected
        );
    }
    let lower = output.forecast.lower().unwrap();
    let upper = output.forecast.upper().unwrap();
    assert!(upper[4] - lower[4] >= upper[0] - lower[0]);
}

#[test]
fn run_writes_the_four_panel_chart() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Data3.xlsx");
    let chart_path = dir.path().join("all_columns_forecast2.png");
    write_xlsx(&input, &enrollment_rows());

    let mut fonts = ChartConfig::default().font_families;
    fonts.push("sans-serif".to_string());
    let config = config_in(dir.path(), &input)
        .with_chart_output(Some(chart_path.clone()))
        .with_chart(ChartConfig::default().with_font_families(fonts));

    Pipeline::new(config).run().unwrap();

    assert!(chart_path.exists());
    assert_eq!(png_size(&chart_path), (4200, 3000));
}

#[test]
fn csv_and_xlsx_inputs_agree() {
    let dir = tempfile::tempdir().unwrap();
    let xlsx = dir.path().join("Data3.xlsx");
    let csv = dir.path().join("Data3.csv");
    write_xlsx(&xlsx, &enrollment_rows());
    write_csv(&csv, &enrollment_rows());

    let from_xlsx = Pipeline::new(config_in(dir.path(), &xlsx)).forecast().unwrap();
    let from_csv = Pipeline::new(config_in(dir.path(), &csv)).forecast().unwrap();

    assert_eq!(from_xlsx.target.order, from_csv.target.order);
    for (a, b) in from_xlsx
        .forecast
        .primary()
        .iter()
        .zip(from_csv.forecast.primary())
    {
        approx::assert_relative_eq!(*a, *b, max_relative = 1e-9);
    }
}

#[test]
fn repeated_runs_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Data3.csv");
    write_csv(&input, &enrollment_rows());
    let config = config_in(dir.path(), &input);

    Pipeline::new(config.clone()).run().unwrap();
    let first = fs::read_to_string(&config.csv_output).unwrap();
    Pipeline::new(config.clone()).run().unwrap();
    let second = fs::read_to_string(&config.csv_output).unwrap();

    assert_eq!(first, second);
}

#[test]
fn shuffled_rows_give_the_same_forecast() {
    let dir = tempfile::tempdir().unwrap();
    let sorted = dir.path().join("sorted.csv");
    let shuffled = dir.path().join("shuffled.csv");
    let rows = enrollment_rows();
    let mut reversed = rows.clone();
    reversed.reverse();
    write_csv(&sorted, &rows);
    write_csv(&shuffled, &reversed);

    let a = Pipeline::new(config_in(dir.path(), &sorted)).forecast().unwrap();
    let b = Pipeline::new(config_in(dir.path(), &shuffled)).forecast().unwrap();
    assert_eq!(a.forecast.primary(), b.forecast.primary());
}

#[test]
fn csv_output_has_unlabeled_index_and_forecast_column() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Data3.csv");
    write_csv(&input, &enrollment_rows());
    let config = config_in(dir.path(), &input);

    Pipeline::new(config.clone()).run().unwrap();
    let content = fs::read_to_string(&config.csv_output).unwrap();
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], ",预测值");
    assert!(lines[1].starts_with("2020-01-01,"));
    assert!(lines[5].starts_with("2024-01-01,"));
    for line in &lines[1..] {
        let value: f64 = line.split(',').nth(1).unwrap().parse().unwrap();
        assert!(value.is_finite());
    }
}

#[test]
fn interval_columns_are_written_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Data3.csv");
    write_csv(&input, &enrollment_rows());
    let config = config_in(dir.path(), &input).with_intervals(true);

    Pipeline::new(config.clone()).run().unwrap();
    let content = fs::read_to_string(&config.csv_output).unwrap();
    assert_eq!(content.lines().next().unwrap(), ",预测值,lower,upper");
    assert_eq!(content.lines().count(), 6);
}

#[test]
fn missing_input_fails_at_load_without_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::new(dir.path().join("Data3.xlsx"))
        .with_csv_output(dir.path().join("out.csv"))
        .with_chart_output(Some(dir.path().join("out.png")));

    let err = Pipeline::new(config.clone()).run().unwrap_err();
    assert_eq!(err.stage, Stage::Load);
    assert!(matches!(err.error, ForecastError::MissingFile(_)));
    assert!(!config.csv_output.exists());
    assert!(!dir.path().join("out.png").exists());
}

#[test]
fn duplicate_year_fails_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Data3.csv");
    let mut rows = enrollment_rows();
    rows[5][0] = rows[4][0];
    write_csv(&input, &rows);

    let err = Pipeline::new(config_in(dir.path(), &input))
        .forecast()
        .unwrap_err();
    assert_eq!(err.stage, Stage::Load);
    match err.error {
        ForecastError::DataFormat(msg) => assert!(msg.contains("2004")),
        other => panic!("expected DataFormat, got {:?}", other),
    }
}

#[test]
fn missing_covariate_column_fails_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Data3.csv");
    write_csv(&input, &enrollment_rows());
    let config = config_in(dir.path(), &input).with_exog([SCHOOLS, "高等教育阶段专任教师数"]);

    let err = Pipeline::new(config).forecast().unwrap_err();
    assert_eq!(err.stage, Stage::Load);
    assert!(matches!(err.error, ForecastError::DataFormat(_)));
}

#[test]
fn too_short_history_fails_in_a_modelling_stage() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Data3.csv");
    write_csv(&input, &enrollment_rows()[..3]);

    let err = Pipeline::new(config_in(dir.path(), &input))
        .forecast()
        .unwrap_err();
    assert_eq!(err.stage, Stage::ExogenousForecast);
}
