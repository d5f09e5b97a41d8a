//! ARIMA model with optional exogenous regressors.
//!
//! With regressors the model is a regression with ARIMA errors:
//!
//! ```text
//! Δᵈy_t = c + βᵀ Δᵈx_t + u_t,   φ(B) u_t = θ(B) ε_t
//! ```
//!
//! Parameters are estimated by conditional sum of squares on standardized
//! data, minimized with Nelder-Mead.

use std::fmt;

use chrono::NaiveDate;
use tracing::debug;

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{difference, difference_continuation, integrate};
use crate::models::Forecaster;
use crate::utils::ols::ols_fit;
use crate::utils::optimization::{nelder_mead_with_restarts, NelderMeadConfig};
use crate::utils::stats::{scale_factor, two_sided_z};

/// ARIMA model specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ARIMASpec {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
    /// Whether a constant is estimated (a drift when d = 1).
    pub with_intercept: bool,
}

impl ARIMASpec {
    /// Create a specification; the constant is included when `d < 2`.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            with_intercept: d < 2,
        }
    }

    pub fn with_intercept(mut self, with_intercept: bool) -> Self {
        self.with_intercept = with_intercept;
        self
    }

    /// Number of estimated coefficients for `n_exog` regressors (σ² excluded).
    pub fn num_params(&self, n_exog: usize) -> usize {
        self.p + self.q + usize::from(self.with_intercept) + n_exog
    }
}

impl Default for ARIMASpec {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl fmt::Display for ARIMASpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.with_intercept {
            write!(f, " with constant")?;
        }
        Ok(())
    }
}

/// Position of each parameter group inside the optimizer's vector.
#[derive(Debug, Clone, Copy)]
struct ParamLayout {
    intercept: bool,
    k: usize,
    p: usize,
    q: usize,
}

impl ParamLayout {
    fn len(&self) -> usize {
        usize::from(self.intercept) + self.k + self.p + self.q
    }

    fn split<'a>(&self, params: &'a [f64]) -> (f64, &'a [f64], &'a [f64], &'a [f64]) {
        let c_len = usize::from(self.intercept);
        let c = if self.intercept { params[0] } else { 0.0 };
        let beta = &params[c_len..c_len + self.k];
        let ar = &params[c_len + self.k..c_len + self.k + self.p];
        let ma = &params[c_len + self.k + self.p..];
        (c, beta, ar, ma)
    }
}

/// Regression errors `u_t = y_t - c - βᵀx_t`.
fn regression_errors(y: &[f64], x: &[Vec<f64>], c: f64, beta: &[f64]) -> Vec<f64> {
    (0..y.len())
        .map(|t| {
            let reg: f64 = beta.iter().zip(x).map(|(b, col)| b * col[t]).sum();
            y[t] - c - reg
        })
        .collect()
}

/// One-step innovations of an ARMA(p, q) process, zero before index `p`.
fn innovations(u: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut e = vec![0.0; u.len()];
    for t in p..u.len() {
        let mut pred = 0.0;
        for (i, phi) in ar.iter().enumerate() {
            pred += phi * u[t - 1 - i];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                pred += theta * e[t - 1 - j];
            }
        }
        e[t] = u[t] - pred;
    }
    e
}

/// ψ weights of `θ(B) / (φ(B)(1 - B)ᵈ)` for the first `horizon` lags.
pub(crate) fn psi_weights(ar: &[f64], ma: &[f64], d: usize, horizon: usize) -> Vec<f64> {
    if horizon == 0 {
        return Vec::new();
    }

    let mut poly = Vec::with_capacity(ar.len() + d + 1);
    poly.push(1.0);
    poly.extend(ar.iter().map(|c| -c));
    for _ in 0..d {
        let mut next = vec![0.0; poly.len() + 1];
        for (i, &c) in poly.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c;
        }
        poly = next;
    }
    let phi_star: Vec<f64> = poly[1..].iter().map(|c| -c).collect();

    let mut psi = vec![0.0; horizon];
    psi[0] = 1.0;
    for j in 1..horizon {
        let mut value = ma.get(j - 1).copied().unwrap_or(0.0);
        for i in 1..=phi_star.len().min(j) {
            value += phi_star[i - 1] * psi[j - i];
        }
        psi[j] = value;
    }
    psi
}

/// ARIMA forecasting model, optionally with exogenous regressors.
#[derive(Debug, Clone)]
pub struct ARIMA {
    spec: ARIMASpec,
    enforce_stationarity: bool,
    enforce_invertibility: bool,
    /// Differenced observations the sum of squares is conditioned on.
    conditioning: usize,
    ar_coefficients: Vec<f64>,
    ma_coefficients: Vec<f64>,
    intercept: f64,
    exog_coefficients: Vec<f64>,
    exog_names: Vec<String>,
    /// Training target (index and values).
    training: Option<TimeSeries>,
    /// Training regressors, column-major in `exog_names` order.
    exog_history: Vec<Vec<f64>>,
    /// Regression errors on the differenced scale.
    errors: Option<Vec<f64>>,
    /// Innovations on the differenced scale.
    innovations: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    sigma2: Option<f64>,
    log_likelihood: Option<f64>,
    aic: Option<f64>,
    aicc: Option<f64>,
    bic: Option<f64>,
    converged: bool,
}

impl ARIMA {
    /// Create a new ARIMA(p, d, q) model.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::from_spec(ARIMASpec::new(p, d, q))
    }

    /// Create a model from a full specification.
    pub fn from_spec(spec: ARIMASpec) -> Self {
        Self {
            spec,
            enforce_stationarity: true,
            enforce_invertibility: true,
            conditioning: 0,
            ar_coefficients: vec![],
            ma_coefficients: vec![],
            intercept: 0.0,
            exog_coefficients: vec![],
            exog_names: vec![],
            training: None,
            exog_history: vec![],
            errors: None,
            innovations: None,
            fitted: None,
            residuals: None,
            sigma2: None,
            log_likelihood: None,
            aic: None,
            aicc: None,
            bic: None,
            converged: false,
        }
    }

    /// Bound AR coefficients to (-0.99, 0.99) during estimation (default on).
    pub fn with_enforce_stationarity(mut self, enforce: bool) -> Self {
        self.enforce_stationarity = enforce;
        self
    }

    /// Bound MA coefficients to (-0.99, 0.99) during estimation (default on).
    pub fn with_enforce_invertibility(mut self, enforce: bool) -> Self {
        self.enforce_invertibility = enforce;
        self
    }

    /// Condition the sum of squares and the likelihood on the first `start`
    /// differenced observations instead of the first `p`.
    ///
    /// Models fitted with the same `start` (at least their `p`) are scored on
    /// the same residuals, so their information criteria are comparable.
    pub fn with_conditioning(mut self, start: usize) -> Self {
        self.conditioning = start;
        self
    }

    pub fn spec(&self) -> ARIMASpec {
        self.spec
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Regression coefficients, in `exog_names` order.
    pub fn exog_coefficients(&self) -> &[f64] {
        &self.exog_coefficients
    }

    /// Innovation variance.
    pub fn sigma2(&self) -> Option<f64> {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> Option<f64> {
        self.log_likelihood
    }

    pub fn aic(&self) -> Option<f64> {
        self.aic
    }

    pub fn aicc(&self) -> Option<f64> {
        self.aicc
    }

    pub fn bic(&self) -> Option<f64> {
        self.bic
    }

    /// Whether the optimizer met its tolerance.
    pub fn converged(&self) -> bool {
        self.converged
    }

    fn fit_internal(&mut self, series: &TimeSeries, exog: Option<&TimeSeries>) -> Result<()> {
        let y = series.primary_values();
        if y.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::MissingValues);
        }

        let (names, x_raw) = match exog {
            Some(exog) => {
                if exog.timestamps() != series.timestamps() {
                    return Err(ForecastError::ExogMismatch(
                        "regressor index does not match the series index".to_string(),
                    ));
                }
                if exog.has_missing_values() {
                    return Err(ForecastError::MissingValues);
                }
                let names: Vec<String> = if exog.labels().is_empty() {
                    (0..exog.dimensions()).map(|i| format!("x{}", i)).collect()
                } else {
                    exog.labels().to_vec()
                };
                (names, exog.values_by_dimension().to_vec())
            }
            None => (vec![], vec![]),
        };

        let ARIMASpec {
            p,
            d,
            q,
            with_intercept,
        } = self.spec;
        let k = x_raw.len();
        let n_coef = self.spec.num_params(k);
        let burn_in = p.max(self.conditioning);
        let needed = d + burn_in.max(q) + n_coef + 2;
        if y.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: y.len(),
            });
        }

        let yd = difference(y, d);
        let xd: Vec<Vec<f64>> = x_raw.iter().map(|col| difference(col, d)).collect();

        // Standardize so the optimizer works on O(1) values.
        let sy = scale_factor(&yd);
        let sx: Vec<f64> = xd.iter().map(|col| scale_factor(col)).collect();
        let z: Vec<f64> = yd.iter().map(|v| v / sy).collect();
        let w: Vec<Vec<f64>> = xd
            .iter()
            .zip(&sx)
            .map(|(col, s)| col.iter().map(|v| v / s).collect())
            .collect();

        let layout = ParamLayout {
            intercept: with_intercept,
            k,
            p,
            q,
        };

        let w_refs: Vec<&[f64]> = w.iter().map(|c| c.as_slice()).collect();
        let start = ols_fit(&z, &w_refs, with_intercept)?;
        let mut initial = Vec::with_capacity(layout.len());
        if with_intercept {
            initial.push(start.intercept);
        }
        initial.extend_from_slice(&start.coefficients);
        initial.extend((0..p).map(|i| 0.1 / (i + 1) as f64));
        initial.extend((0..q).map(|i| 0.1 / (i + 1) as f64));

        let ar_bound = if self.enforce_stationarity {
            (-0.99, 0.99)
        } else {
            (f64::NEG_INFINITY, f64::INFINITY)
        };
        let ma_bound = if self.enforce_invertibility {
            (-0.99, 0.99)
        } else {
            (f64::NEG_INFINITY, f64::INFINITY)
        };
        let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY); usize::from(with_intercept) + k];
        bounds.extend(std::iter::repeat(ar_bound).take(p));
        bounds.extend(std::iter::repeat(ma_bound).take(q));

        let objective = |params: &[f64]| -> f64 {
            let (c, beta, ar, ma) = layout.split(params);
            let u = regression_errors(&z, &w, c, beta);
            let e = innovations(&u, ar, ma);
            e[burn_in..].iter().map(|v| v * v).sum()
        };

        let config = NelderMeadConfig {
            max_iter: (400 * (layout.len() + 1)).max(2000),
            tolerance: 1e-8,
            ..Default::default()
        };
        let result = nelder_mead_with_restarts(objective, &initial, Some(&bounds), &config, 1);

        if !result.optimal_value.is_finite() {
            return Err(ForecastError::Convergence(format!(
                "{} produced a non-finite sum of squares",
                self.spec
            )));
        }
        if !result.converged {
            return Err(ForecastError::Convergence(format!(
                "{} did not converge after {} iterations",
                self.spec, result.iterations
            )));
        }

        let (c_z, beta_z, ar, ma) = layout.split(&result.optimal_point);
        self.intercept = c_z * sy;
        self.exog_coefficients = beta_z
            .iter()
            .zip(&sx)
            .map(|(b, s)| b * sy / s)
            .collect();
        self.ar_coefficients = ar.to_vec();
        self.ma_coefficients = ma.to_vec();
        self.converged = true;

        let u = regression_errors(&yd, &xd, self.intercept, &self.exog_coefficients);
        let e = innovations(&u, &self.ar_coefficients, &self.ma_coefficients);
        let residuals = e[burn_in..].to_vec();
        let n_eff = residuals.len() as f64;
        let sigma2 = (residuals.iter().map(|r| r * r).sum::<f64>() / n_eff).max(f64::MIN_POSITIVE);

        let ll = -0.5 * n_eff * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        let n_params = (n_coef + 1) as f64;
        let aic = -2.0 * ll + 2.0 * n_params;
        let aicc = if n_eff - n_params - 1.0 > 0.0 {
            aic + 2.0 * n_params * (n_params + 1.0) / (n_eff - n_params - 1.0)
        } else {
            f64::INFINITY
        };

        let mut fitted = vec![f64::NAN; y.len()];
        for t in (d + p)..y.len() {
            fitted[t] = y[t] - e[t - d];
        }

        debug!(
            model = %self.spec,
            exog = k,
            sigma2,
            aic,
            iterations = result.iterations,
            "fitted ARIMA"
        );

        self.sigma2 = Some(sigma2);
        self.log_likelihood = Some(ll);
        self.aic = Some(aic);
        self.aicc = Some(aicc);
        self.bic = Some(-2.0 * ll + n_params * n_eff.ln());
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        self.errors = Some(u);
        self.innovations = Some(e);
        self.exog_names = names;
        self.exog_history = x_raw;
        self.training = Some(series.clone());
        Ok(())
    }

    /// Timestamps following the training index.
    fn future_index(&self, horizon: usize) -> Result<Vec<NaiveDate>> {
        self.training
            .as_ref()
            .ok_or(ForecastError::FitRequired)?
            .future_timestamps(horizon)
    }

    /// Check that `future` carries exactly the training regressors over the
    /// next `horizon` timestamps, and return its columns in training order.
    fn align_future_exog(&self, horizon: usize, future: &TimeSeries) -> Result<Vec<Vec<f64>>> {
        if future.len() != horizon {
            return Err(ForecastError::DimensionMismatch {
                expected: horizon,
                got: future.len(),
            });
        }

        let expected = self.future_index(horizon)?;
        if future.timestamps() != expected.as_slice() {
            return Err(ForecastError::ExogMismatch(format!(
                "future regressor index {:?} does not follow the training index (expected {:?})",
                future.timestamps(),
                expected
            )));
        }

        let missing: Vec<&str> = self
            .exog_names
            .iter()
            .filter(|name| future.label_position(name).is_none())
            .map(|s| s.as_str())
            .collect();
        let extra: Vec<&str> = future
            .labels()
            .iter()
            .filter(|name| !self.exog_names.contains(name))
            .map(|s| s.as_str())
            .collect();
        if !missing.is_empty() || !extra.is_empty() || future.dimensions() != self.exog_names.len()
        {
            return Err(ForecastError::ExogMismatch(format!(
                "future regressors must match training regressors {:?} (missing {:?}, unexpected {:?})",
                self.exog_names, missing, extra
            )));
        }

        let aligned = self
            .exog_names
            .iter()
            .map(|name| future.column(name).map(|c| c.to_vec()))
            .collect::<Result<Vec<_>>>()?;
        if aligned.iter().any(|col| col.iter().any(|v| !v.is_finite())) {
            return Err(ForecastError::MissingValues);
        }
        Ok(aligned)
    }

    /// Point forecasts for `horizon` steps given future regressors in
    /// training order.
    fn forecast_points(&self, horizon: usize, future_exog: &[Vec<f64>]) -> Result<Vec<f64>> {
        let training = self.training.as_ref().ok_or(ForecastError::FitRequired)?;
        let errors = self.errors.as_ref().ok_or(ForecastError::FitRequired)?;
        let innovations = self.innovations.as_ref().ok_or(ForecastError::FitRequired)?;
        let d = self.spec.d;

        let future_xd: Vec<Vec<f64>> = self
            .exog_history
            .iter()
            .zip(future_exog)
            .map(|(hist, fut)| difference_continuation(hist, fut, d))
            .collect();

        let mut u = errors.clone();
        let mut e = innovations.clone();
        let mut forecast_diff = Vec::with_capacity(horizon);
        for step in 0..horizon {
            let t = u.len();
            let mut next = 0.0;
            for (i, phi) in self.ar_coefficients.iter().enumerate() {
                if t > i {
                    next += phi * u[t - 1 - i];
                }
            }
            for (j, theta) in self.ma_coefficients.iter().enumerate() {
                if t > j {
                    next += theta * e[t - 1 - j];
                }
            }
            u.push(next);
            e.push(0.0);

            let reg: f64 = self
                .exog_coefficients
                .iter()
                .zip(&future_xd)
                .map(|(b, col)| b * col[step])
                .sum();
            forecast_diff.push(self.intercept + reg + next);
        }

        Ok(integrate(&forecast_diff, training.primary_values(), d))
    }

    fn with_intervals(&self, points: Vec<f64>, level: f64) -> Result<Forecast> {
        if !(level > 0.0 && level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "confidence level must be in (0, 1), got {}",
                level
            )));
        }
        let sigma2 = self.sigma2.ok_or(ForecastError::FitRequired)?;
        let z = two_sided_z(level);
        let psi = psi_weights(
            &self.ar_coefficients,
            &self.ma_coefficients,
            self.spec.d,
            points.len(),
        );

        let mut cumulative = 0.0;
        let mut lower = Vec::with_capacity(points.len());
        let mut upper = Vec::with_capacity(points.len());
        for (point, weight) in points.iter().zip(&psi) {
            cumulative += weight * weight;
            let half_width = z * (sigma2 * cumulative).sqrt();
            lower.push(point - half_width);
            upper.push(point + half_width);
        }
        Forecast::from_values_with_intervals(points, lower, upper, level)
    }

    fn attach_index(&self, forecast: Forecast) -> Result<Forecast> {
        match self.future_index(forecast.horizon()) {
            Ok(index) => forecast.with_index(index),
            Err(_) => Ok(forecast),
        }
    }

    fn require_no_exog(&self) -> Result<()> {
        if self.training.is_none() {
            return Err(ForecastError::FitRequired);
        }
        if !self.exog_names.is_empty() {
            return Err(ForecastError::ExogMismatch(
                "model was fitted with regressors; future regressor values are required"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn require_exog(&self) -> Result<()> {
        if self.training.is_none() {
            return Err(ForecastError::FitRequired);
        }
        if self.exog_names.is_empty() {
            return Err(ForecastError::ExogMismatch(
                "model was fitted without regressors".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ARIMA {
    fn default() -> Self {
        Self::from_spec(ARIMASpec::default())
    }
}

impl Forecaster for ARIMA {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        self.fit_internal(series, None)
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        self.require_no_exog()?;
        let points = self.forecast_points(horizon, &[])?;
        self.attach_index(Forecast::from_values(points))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        self.require_no_exog()?;
        let points = self.forecast_points(horizon, &[])?;
        self.attach_index(self.with_intervals(points, level)?)
    }

    fn fit_with_exog(&mut self, series: &TimeSeries, exog: &TimeSeries) -> Result<()> {
        self.fit_internal(series, Some(exog))
    }

    fn predict_with_exog(&self, horizon: usize, future: &TimeSeries) -> Result<Forecast> {
        self.require_exog()?;
        let aligned = self.align_future_exog(horizon, future)?;
        let points = self.forecast_points(horizon, &aligned)?;
        Forecast::from_values(points).with_index(future.timestamps().to_vec())
    }

    fn predict_with_exog_intervals(
        &self,
        horizon: usize,
        future: &TimeSeries,
        level: f64,
    ) -> Result<Forecast> {
        self.require_exog()?;
        let aligned = self.align_future_exog(horizon, future)?;
        let points = self.forecast_points(horizon, &aligned)?;
        self.with_intervals(points, level)?
            .with_index(future.timestamps().to_vec())
    }

    fn supports_exog(&self) -> bool {
        true
    }

    fn has_exog(&self) -> bool {
        !self.exog_names.is_empty()
    }

    fn exog_names(&self) -> Option<&[String]> {
        if self.exog_names.is_empty() {
            None
        } else {
            Some(&self.exog_names)
        }
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "ARIMA"
    }
}
