//! Property-based tests for table loading, future indexing and forecasting.

use std::fs;

use chrono::Datelike;
use enrollment_forecast::core::{Frequency, TimeSeries};
use enrollment_forecast::io::{load_table, LoadOptions};
use enrollment_forecast::models::arima::{ARIMASpec, ARIMA};
use enrollment_forecast::models::Forecaster;
use proptest::prelude::*;

/// Contiguous years starting at `first`, each with two numeric columns, in
/// an arbitrary row order.
fn shuffled_table_strategy() -> impl Strategy<Value = (i32, Vec<(i32, f64, f64)>)> {
    (1950..2010i32, 8usize..25).prop_flat_map(|(first, len)| {
        let rows: Vec<(i32, f64, f64)> = (0..len)
            .map(|i| (first + i as i32, 100.0 + i as f64, 1000.0 - 3.0 * i as f64))
            .collect();
        (Just(first), Just(rows).prop_shuffle())
    })
}

fn trending_values_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (min_len..max_len).prop_flat_map(|len| {
        (0.0..100.0_f64, 0.5..5.0_f64, prop::collection::vec(-1.0..1.0_f64, len)).prop_map(
            move |(base, slope, wiggle)| {
                (0..len)
                    .map(|i| base + slope * i as f64 + wiggle[i])
                    .collect()
            },
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn loader_sorts_contiguous_years((first, rows) in shuffled_table_strategy()) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let mut content = String::from("年份,a,b\n");
        for (year, a, b) in &rows {
            content.push_str(&format!("{},{},{}\n", year, a, b));
        }
        fs::write(&path, content).unwrap();

        let table = load_table(&path, &LoadOptions::default()).unwrap();
        let expected: Vec<i32> = (0..rows.len() as i32).map(|i| first + i).collect();

        prop_assert_eq!(table.years(), expected);
        prop_assert_eq!(table.frequency(), Some(Frequency::YearStart));
        prop_assert!(Frequency::YearStart.is_regular(table.timestamps()));
        let a = table.column("a").unwrap();
        for (i, v) in a.iter().enumerate() {
            prop_assert_eq!(*v, 100.0 + i as f64);
        }
    }

    #[test]
    fn future_timestamps_continue_the_years(first in 1900..2100i32, len in 1usize..30, horizon in 1usize..10) {
        let values: Vec<f64> = (0..len).map(|i| i as f64).collect();
        let table = TimeSeries::annual(first, vec![values], vec!["v".to_string()]).unwrap();
        let last = first + len as i32 - 1;

        let future = table.future_timestamps(horizon).unwrap();
        prop_assert_eq!(future.len(), horizon);
        for (i, date) in future.iter().enumerate() {
            prop_assert_eq!(date.year(), last + 1 + i as i32);
            prop_assert_eq!(date.month(), 1);
            prop_assert_eq!(date.day(), 1);
        }
    }

    #[test]
    fn arima_intervals_contain_point_forecasts(values in trending_values_strategy(20, 40), horizon in 1usize..8) {
        let table = TimeSeries::annual(2000, vec![values], vec!["y".to_string()]).unwrap();
        let mut model = ARIMA::from_spec(ARIMASpec::new(0, 1, 1));
        if model.fit(&table).is_ok() {
            let forecast = model.predict_with_intervals(horizon, 0.95).unwrap();
            let lower = forecast.lower().unwrap();
            let upper = forecast.upper().unwrap();
            prop_assert_eq!(forecast.horizon(), horizon);
            for (i, point) in forecast.primary().iter().enumerate() {
                prop_assert!(point.is_finite());
                prop_assert!(lower[i] <= *point && *point <= upper[i]);
            }
            for i in 1..horizon {
                prop_assert!(upper[i] - lower[i] >= upper[i - 1] - lower[i - 1] - 1e-9);
            }
        }
    }
}
