//! Differencing utilities for ARIMA models.

/// Apply `d` rounds of first differencing.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Differences of `future` as a continuation of `history`.
///
/// Returns one value per element of `future`: the `d`-th difference of the
/// concatenated series at each future position.
pub fn difference_continuation(history: &[f64], future: &[f64], d: usize) -> Vec<f64> {
    if d == 0 {
        return future.to_vec();
    }
    let tail_start = history.len().saturating_sub(d);
    let mut joined = history[tail_start..].to_vec();
    joined.extend_from_slice(future);
    let diffed = difference(&joined, d);
    let skip = diffed.len().saturating_sub(future.len());
    diffed[skip..].to_vec()
}

/// Integrate (reverse `d` rounds of differencing) forecasts made on the
/// differenced scale, continuing from the end of `original`.
pub fn integrate(differenced: &[f64], original: &[f64], d: usize) -> Vec<f64> {
    if d == 0 || differenced.is_empty() {
        return differenced.to_vec();
    }

    let mut result = differenced.to_vec();
    for level in (0..d).rev() {
        let anchor = difference(original, level).last().copied().unwrap_or(0.0);
        let mut running = anchor;
        result = result
            .iter()
            .map(|step| {
                running += step;
                running
            })
            .collect();
    }
    result
}
