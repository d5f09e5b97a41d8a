//! Regression with ARIMA errors: fitting on covariates and forecasting from
//! future covariate tables.

use enrollment_forecast::core::TimeSeries;
use enrollment_forecast::error::ForecastError;
use enrollment_forecast::models::arima::{ARIMASpec, AutoARIMA, ARIMA};
use enrollment_forecast::models::Forecaster;

fn noise(i: usize) -> f64 {
    ((i * 37 + 11) % 23) as f64 / 23.0 - 0.5
}

/// y = 10 + 2*x1 - x2 + noise, thirty years from 2000.
fn training() -> (TimeSeries, TimeSeries) {
    let n = 30;
    let x1: Vec<f64> = (0..n).map(|i| 50.0 + 2.0 * i as f64 + 3.0 * noise(i + 4)).collect();
    let x2: Vec<f64> = (0..n).map(|i| 20.0 + 4.0 * noise(i + 7) + (i % 5) as f64).collect();
    let y: Vec<f64> = (0..n)
        .map(|i| 10.0 + 2.0 * x1[i] - x2[i] + 0.5 * noise(i))
        .collect();

    let y = TimeSeries::annual(2000, vec![y], vec!["y".to_string()]).unwrap();
    let x = TimeSeries::annual(2000, vec![x1, x2], vec!["x1".to_string(), "x2".to_string()])
        .unwrap();
    (y, x)
}

fn future(first_year: i32, labels: [&str; 2]) -> TimeSeries {
    let x1: Vec<f64> = (0..3).map(|i| 110.0 + 2.0 * i as f64).collect();
    let x2 = vec![22.0, 21.0, 23.0];
    let (a, b) = if labels[0] == "x1" || labels[0] == "renamed" {
        (x1, x2)
    } else {
        (x2, x1)
    };
    TimeSeries::annual(
        first_year,
        vec![a, b],
        labels.iter().map(|s| s.to_string()).collect(),
    )
    .unwrap()
}

fn fitted() -> ARIMA {
    let (y, x) = training();
    let mut model = ARIMA::from_spec(ARIMASpec::new(1, 0, 0)).with_enforce_stationarity(false);
    model.fit_with_exog(&y, &x).unwrap();
    model
}

#[test]
fn recovers_covariate_effects() {
    let model = fitted();
    let beta = model.exog_coefficients();
    assert_eq!(beta.len(), 2);
    approx::assert_abs_diff_eq!(beta[0], 2.0, epsilon = 0.2);
    approx::assert_abs_diff_eq!(beta[1], -1.0, epsilon = 0.2);
    assert_eq!(
        model.exog_names().unwrap(),
        &["x1".to_string(), "x2".to_string()]
    );
}

#[test]
fn forecast_follows_future_covariates() {
    let model = fitted();
    let forecast = model
        .predict_with_exog_intervals(3, &future(2030, ["x1", "x2"]), 0.95)
        .unwrap();

    let points = forecast.primary();
    assert_eq!(points.len(), 3);
    // 10 + 2*110 - 22
    approx::assert_abs_diff_eq!(points[0], 208.0, epsilon = 3.0);
    assert!(points[1] > points[0] - 3.0);
    let index = forecast.index().unwrap();
    assert_eq!(index[0].format("%Y").to_string(), "2030");
    assert_eq!(index[2].format("%Y").to_string(), "2032");
}

#[test]
fn reordered_future_columns_give_the_same_forecast() {
    let model = fitted();
    let ordered = model.predict_with_exog(3, &future(2030, ["x1", "x2"])).unwrap();
    let reordered = model.predict_with_exog(3, &future(2030, ["x2", "x1"])).unwrap();
    assert_eq!(ordered.primary(), reordered.primary());
}

#[test]
fn renamed_future_column_is_rejected() {
    let model = fitted();
    let err = model
        .predict_with_exog(3, &future(2030, ["renamed", "x2"]))
        .unwrap_err();
    assert!(matches!(err, ForecastError::ExogMismatch(_)));
}

#[test]
fn future_columns_must_follow_the_training_years() {
    let model = fitted();
    let err = model
        .predict_with_exog(3, &future(2031, ["x1", "x2"]))
        .unwrap_err();
    assert!(matches!(err, ForecastError::ExogMismatch(_)));
}

#[test]
fn short_future_table_is_rejected() {
    let model = fitted();
    let err = model
        .predict_with_exog(5, &future(2030, ["x1", "x2"]))
        .unwrap_err();
    assert!(matches!(err, ForecastError::DimensionMismatch { .. }));
}

#[test]
fn plain_predict_requires_covariates() {
    let model = fitted();
    assert!(matches!(
        model.predict(3).unwrap_err(),
        ForecastError::ExogMismatch(_)
    ));
}

#[test]
fn auto_arima_selects_a_model_with_covariates() {
    let (y, x) = training();
    let mut auto = AutoARIMA::new();
    auto.fit_with_exog(&y, &x).unwrap();

    assert!(auto.has_exog());
    let order = auto.selected_order().unwrap();
    assert!(order.p + order.q <= 5);
    let forecast = auto
        .predict_with_exog(3, &future(2030, ["x1", "x2"]))
        .unwrap();
    assert!(forecast.primary().iter().all(|v| v.is_finite()));
}
