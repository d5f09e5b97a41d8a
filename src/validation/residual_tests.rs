//! Residual diagnostic tests for fitted models.

use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Ljung-Box test result.
#[derive(Debug, Clone)]
pub struct LjungBoxResult {
    /// Test statistic Q
    pub statistic: f64,
    /// P-value from the chi-squared distribution
    pub p_value: f64,
    /// Number of lags tested
    pub lags: usize,
    /// Degrees of freedom
    pub df: usize,
}

impl LjungBoxResult {
    /// True when we fail to reject the null of white-noise residuals.
    pub fn is_white_noise(&self, alpha: f64) -> bool {
        self.p_value > alpha
    }
}

/// Ljung-Box portmanteau test for autocorrelation in residuals.
///
/// `lags` defaults to `min(10, n / 5)`; the degrees of freedom are reduced
/// by `fitted_params` (the number of ARMA coefficients), floored at 1.
pub fn ljung_box(residuals: &[f64], lags: Option<usize>, fitted_params: usize) -> LjungBoxResult {
    let n = residuals.len();
    if n < 3 {
        return LjungBoxResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags: 0,
            df: 0,
        };
    }

    let lags = lags.unwrap_or_else(|| 10.min(n / 5)).clamp(1, n - 1);
    let df = lags.saturating_sub(fitted_params).max(1);

    let mean = residuals.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = residuals.iter().map(|&x| x - mean).collect();
    let denom: f64 = centered.iter().map(|x| x * x).sum();
    if denom == 0.0 {
        return LjungBoxResult {
            statistic: 0.0,
            p_value: 1.0,
            lags,
            df,
        };
    }

    let nf = n as f64;
    let statistic = (1..=lags)
        .map(|k| {
            let r_k = centered
                .iter()
                .skip(k)
                .zip(&centered)
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / denom;
            r_k * r_k / (nf - k as f64)
        })
        .sum::<f64>()
        * nf
        * (nf + 2.0);

    let p_value = match ChiSquared::new(df as f64) {
        Ok(chi) => 1.0 - chi.cdf(statistic),
        Err(_) => f64::NAN,
    };

    LjungBoxResult {
        statistic,
        p_value,
        lags,
        df,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ljung_box_accepts_white_noise() {
        let residuals: Vec<f64> = (0..100)
            .map(|i| ((i * 7919 + 13) % 101) as f64 / 50.0 - 1.0)
            .collect();
        let result = ljung_box(&residuals, Some(10), 0);
        assert!(result.statistic.is_finite());
        assert_eq!(result.df, 10);
        assert!(result.p_value >= 0.0 && result.p_value <= 1.0);
    }

    #[test]
    fn ljung_box_rejects_autocorrelated_residuals() {
        let residuals: Vec<f64> = (0..100).map(|i| (i as f64 * 0.1).sin()).collect();
        let result = ljung_box(&residuals, Some(10), 0);
        assert!(!result.is_white_noise(0.05));
    }

    #[test]
    fn ljung_box_adjusts_degrees_of_freedom() {
        let residuals: Vec<f64> = (0..40).map(|i| (i % 5) as f64).collect();
        let result = ljung_box(&residuals, Some(6), 2);
        assert_eq!(result.df, 4);
        let result = ljung_box(&residuals, Some(2), 5);
        assert_eq!(result.df, 1);
    }

    #[test]
    fn ljung_box_degenerate_inputs() {
        assert!(ljung_box(&[1.0, 2.0], None, 0).statistic.is_nan());
        let flat = ljung_box(&[1.0; 10], None, 0);
        assert_eq!(flat.statistic, 0.0);
        assert!(flat.is_white_noise(0.05));
    }
}
