//! KPSS stationarity test and the differencing order it implies.

use crate::models::arima::difference;

/// Result of a stationarity test.
#[derive(Debug, Clone)]
pub struct StationarityResult {
    /// Test statistic
    pub statistic: f64,
    /// P-value, interpolated from the critical value table
    pub p_value: f64,
    /// Number of lags used for the long-run variance
    pub lags: usize,
    /// Whether the series appears stationary at 5%
    pub is_stationary: bool,
}

/// KPSS level-stationarity critical values at 1%, 2.5%, 5% and 10%.
const KPSS_TABLE: [(f64, f64); 4] = [(0.739, 0.01), (0.574, 0.025), (0.463, 0.05), (0.347, 0.10)];

/// KPSS test for level stationarity.
///
/// The null hypothesis is stationarity; small p-values suggest the series
/// needs differencing. `lags` defaults to `trunc(3 * sqrt(n) / 13)`.
pub fn kpss_test(series: &[f64], lags: Option<usize>) -> StationarityResult {
    let n = series.len();
    if n < 3 {
        return StationarityResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags: 0,
            is_stationary: false,
        };
    }

    let lags = lags
        .unwrap_or_else(|| (3.0 * (n as f64).sqrt() / 13.0).trunc() as usize)
        .min(n - 1);

    let mean = series.iter().sum::<f64>() / n as f64;
    let residuals: Vec<f64> = series.iter().map(|&x| x - mean).collect();

    let mut cumsum = 0.0;
    let mut eta = 0.0;
    for &r in &residuals {
        cumsum += r;
        eta += cumsum * cumsum;
    }
    eta /= (n * n) as f64;

    // Long-run variance with Bartlett weights.
    let mut long_run = residuals.iter().map(|&r| r * r).sum::<f64>();
    for j in 1..=lags {
        let weight = 1.0 - j as f64 / (lags + 1) as f64;
        let autocov: f64 = residuals
            .iter()
            .skip(j)
            .zip(&residuals)
            .map(|(a, b)| a * b)
            .sum();
        long_run += 2.0 * weight * autocov;
    }
    long_run /= n as f64;

    if long_run <= 0.0 || !long_run.is_finite() {
        return StationarityResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags,
            is_stationary: true,
        };
    }

    let statistic = eta / long_run;
    let p_value = kpss_p_value(statistic);

    StationarityResult {
        statistic,
        p_value,
        lags,
        is_stationary: p_value >= 0.05,
    }
}

/// Linear interpolation of the KPSS p-value, clamped to [0.01, 0.10].
fn kpss_p_value(stat: f64) -> f64 {
    if stat.is_nan() {
        return f64::NAN;
    }
    let (first_cv, first_p) = KPSS_TABLE[0];
    let (last_cv, last_p) = KPSS_TABLE[KPSS_TABLE.len() - 1];
    if stat >= first_cv {
        return first_p;
    }
    if stat <= last_cv {
        return last_p;
    }
    for pair in KPSS_TABLE.windows(2) {
        let (hi_cv, hi_p) = pair[0];
        let (lo_cv, lo_p) = pair[1];
        if stat <= hi_cv && stat >= lo_cv {
            let frac = (stat - lo_cv) / (hi_cv - lo_cv);
            return lo_p + frac * (hi_p - lo_p);
        }
    }
    last_p
}

fn is_constant(series: &[f64]) -> bool {
    series
        .first()
        .map(|&first| series.iter().all(|&v| (v - first).abs() <= 1e-12 * (1.0 + first.abs())))
        .unwrap_or(true)
}

/// Number of differences needed for level stationarity, by repeated KPSS
/// tests at `alpha`, capped at `max_d`.
pub fn ndiffs(series: &[f64], alpha: f64, max_d: usize) -> usize {
    if is_constant(series) {
        return 0;
    }

    let mut result = kpss_test(series, None);
    if result.p_value.is_nan() {
        return 0;
    }

    let mut d = 0;
    let mut current = series.to_vec();
    while result.p_value < alpha && d < max_d {
        d += 1;
        current = difference(&current, 1);
        if is_constant(&current) {
            return d;
        }
        result = kpss_test(&current, None);
        if result.p_value.is_nan() {
            return d - 1;
        }
    }
    d
}
