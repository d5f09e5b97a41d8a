//! Statistical utility functions.

use statrs::distribution::{ContinuousCDF, Normal};

/// Quantile function of the standard normal distribution.
///
/// # Example
/// ```
/// use enrollment_forecast::utils::quantile_normal;
///
/// // 95% two-sided interval -> z ≈ 1.96
/// let z = quantile_normal(0.975);
/// assert!((z - 1.96).abs() < 0.01);
/// ```
pub fn quantile_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

/// Two-sided critical value for an interval with coverage `level`.
pub fn two_sided_z(level: f64) -> f64 {
    quantile_normal((1.0 + level) / 2.0)
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the variance of a slice (sample variance with n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Calculate the standard deviation of a slice.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Scale factor for standardizing a series: its standard deviation, or 1
/// when the series is (near) constant or too short.
pub fn scale_factor(values: &[f64]) -> f64 {
    let sd = std_dev(values);
    if sd.is_finite() && sd > 1e-12 {
        sd
    } else {
        1.0
    }
}
