//! Automatic ARIMA order selection.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::model::{ARIMASpec, ARIMA};
use crate::models::Forecaster;
use crate::validation::ndiffs;

/// Minimum number of observations for an order search.
const MIN_OBSERVATIONS: usize = 6;

/// Upper bound on stepwise moves.
const MAX_STEPWISE_STEPS: usize = 100;

/// Information criterion minimised by the order search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InformationCriterion {
    #[default]
    Aic,
    Aicc,
    Bic,
}

impl InformationCriterion {
    fn score(&self, model: &ARIMA) -> Option<f64> {
        match self {
            InformationCriterion::Aic => model.aic(),
            InformationCriterion::Aicc => model.aicc(),
            InformationCriterion::Bic => model.bic(),
        }
    }
}

impl fmt::Display for InformationCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InformationCriterion::Aic => "aic",
            InformationCriterion::Aicc => "aicc",
            InformationCriterion::Bic => "bic",
        };
        f.write_str(name)
    }
}

/// Configuration for AutoARIMA.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoARIMAConfig {
    /// Maximum AR order to consider.
    pub max_p: usize,
    /// Maximum MA order to consider.
    pub max_q: usize,
    /// Maximum differencing order.
    pub max_d: usize,
    /// Maximum `p + q` in an exhaustive search.
    pub max_order: usize,
    /// Fixed differencing order; chosen by KPSS tests when `None`.
    pub d: Option<usize>,
    /// Use stepwise search (faster) vs exhaustive.
    pub stepwise: bool,
    /// Selection criterion.
    pub criterion: InformationCriterion,
    /// Include a constant; `None` includes one when `d < 2`.
    pub with_intercept: Option<bool>,
    /// Significance level of the KPSS tests choosing `d`.
    pub kpss_alpha: f64,
}

impl Default for AutoARIMAConfig {
    fn default() -> Self {
        Self {
            max_p: 5,
            max_q: 5,
            max_d: 2,
            max_order: 5,
            d: None,
            stepwise: true,
            criterion: InformationCriterion::Aic,
            with_intercept: None,
            kpss_alpha: 0.05,
        }
    }
}

impl AutoARIMAConfig {
    /// Set maximum orders.
    pub fn with_max_orders(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_d = max_d;
        self.max_q = max_q;
        self
    }

    pub fn with_max_order(mut self, max_order: usize) -> Self {
        self.max_order = max_order;
        self
    }

    /// Fix the differencing order instead of testing for it.
    pub fn with_d(mut self, d: usize) -> Self {
        self.d = Some(d);
        self
    }

    pub fn with_criterion(mut self, criterion: InformationCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_intercept(mut self, with_intercept: bool) -> Self {
        self.with_intercept = Some(with_intercept);
        self
    }

    pub fn with_kpss_alpha(mut self, alpha: f64) -> Self {
        self.kpss_alpha = alpha;
        self
    }

    /// Use exhaustive search instead of stepwise.
    pub fn exhaustive(mut self) -> Self {
        self.stepwise = false;
        self
    }
}

/// Model order (p, d, q) and whether a constant is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub with_intercept: bool,
}

impl ModelOrder {
    pub fn new(p: usize, d: usize, q: usize, with_intercept: bool) -> Self {
        Self {
            p,
            d,
            q,
            with_intercept,
        }
    }

    /// The ARIMA specification for this order.
    pub fn spec(&self) -> ARIMASpec {
        ARIMASpec::new(self.p, self.d, self.q).with_intercept(self.with_intercept)
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// Automatic ARIMA model selection.
///
/// Chooses `d` by repeated KPSS tests, then searches `(p, q)` and the
/// constant by minimising an information criterion, either stepwise
/// (Hyndman-Khandakar) or exhaustively. Candidates that fail to fit are
/// skipped.
#[derive(Debug, Clone)]
pub struct AutoARIMA {
    config: AutoARIMAConfig,
    selected_model: Option<ARIMA>,
    selected_order: Option<ModelOrder>,
    /// All fitted models and their scores.
    model_scores: Vec<(ModelOrder, f64)>,
}

/// Book-keeping for one search: what was tried and the best so far.
struct Search<'a> {
    series: &'a TimeSeries,
    exog: Option<&'a TimeSeries>,
    criterion: InformationCriterion,
    /// Shared burn-in so every candidate is scored on the same residuals.
    conditioning: usize,
    max_p: usize,
    max_q: usize,
    tried: HashSet<ModelOrder>,
    scores: Vec<(ModelOrder, f64)>,
    best: Option<(ModelOrder, f64, ARIMA)>,
}

impl<'a> Search<'a> {
    /// Fit `order` unless already tried; returns true if it became the best.
    fn try_order(&mut self, order: ModelOrder) -> bool {
        if !self.tried.insert(order) {
            return false;
        }

        let mut model = ARIMA::from_spec(order.spec()).with_conditioning(self.conditioning);
        let fitted = match self.exog {
            Some(exog) => model.fit_with_exog(self.series, exog),
            None => model.fit(self.series),
        };
        if let Err(e) = fitted {
            debug!(model = %order, error = %e, "skipping candidate");
            return false;
        }

        let score = match self.criterion.score(&model) {
            Some(score) if score.is_finite() => score,
            _ => {
                debug!(model = %order, "skipping candidate with non-finite criterion");
                return false;
            }
        };
        debug!(
            "{} const={} {}={:.3}",
            order, order.with_intercept, self.criterion, score
        );
        self.scores.push((order, score));

        let improved = self
            .best
            .as_ref()
            .map_or(true, |(_, best_score, _)| score < *best_score);
        if improved {
            self.best = Some((order, score, model));
        }
        improved
    }

    fn best_order(&self) -> Option<ModelOrder> {
        self.best.as_ref().map(|(order, _, _)| *order)
    }
}

impl AutoARIMA {
    /// Create a new AutoARIMA with default configuration.
    pub fn new() -> Self {
        Self::with_config(AutoARIMAConfig::default())
    }

    /// Create AutoARIMA with custom configuration.
    pub fn with_config(config: AutoARIMAConfig) -> Self {
        Self {
            config,
            selected_model: None,
            selected_order: None,
            model_scores: Vec::new(),
        }
    }

    pub fn config(&self) -> &AutoARIMAConfig {
        &self.config
    }

    /// Get the selected order.
    pub fn selected_order(&self) -> Option<ModelOrder> {
        self.selected_order
    }

    /// The fitted model for the selected order.
    pub fn selected_model(&self) -> Option<&ARIMA> {
        self.selected_model.as_ref()
    }

    /// Get all model scores, best first.
    pub fn model_scores(&self) -> &[(ModelOrder, f64)] {
        &self.model_scores
    }

    fn stepwise(&self, search: &mut Search<'_>, d: usize, constant: bool) {
        let (max_p, max_q) = (search.max_p, search.max_q);

        let mut starts = vec![
            ModelOrder::new(2.min(max_p), d, 2.min(max_q), constant),
            ModelOrder::new(0, d, 0, constant),
            ModelOrder::new(1.min(max_p), d, 0, constant),
            ModelOrder::new(0, d, 1.min(max_q), constant),
        ];
        if constant {
            starts.push(ModelOrder::new(0, d, 0, false));
        }
        for order in starts {
            search.try_order(order);
        }

        for _ in 0..MAX_STEPWISE_STEPS {
            let Some(current) = search.best_order() else {
                return;
            };

            let (p, q) = (current.p as isize, current.q as isize);
            let moves: [(isize, isize); 8] = [
                (-1, 0),
                (1, 0),
                (0, -1),
                (0, 1),
                (-1, -1),
                (1, 1),
                (-1, 1),
                (1, -1),
            ];
            let mut neighbours: Vec<ModelOrder> = moves
                .iter()
                .map(|(dp, dq)| (p + dp, q + dq))
                .filter(|&(np, nq)| {
                    np >= 0 && nq >= 0 && np as usize <= max_p && nq as usize <= max_q
                })
                .map(|(np, nq)| ModelOrder::new(np as usize, d, nq as usize, current.with_intercept))
                .collect();
            if d < 2 {
                neighbours.push(ModelOrder {
                    with_intercept: !current.with_intercept,
                    ..current
                });
            }

            let improved = neighbours.into_iter().any(|order| search.try_order(order));
            if !improved {
                return;
            }
        }
    }

    fn exhaustive(&self, search: &mut Search<'_>, d: usize, constant: bool) {
        for p in 0..=search.max_p {
            for q in 0..=search.max_q {
                if p + q <= self.config.max_order {
                    search.try_order(ModelOrder::new(p, d, q, constant));
                }
            }
        }
    }

    fn fit_internal(&mut self, series: &TimeSeries, exog: Option<&TimeSeries>) -> Result<()> {
        let values = series.primary_values();
        if values.len() < MIN_OBSERVATIONS {
            return Err(ForecastError::InsufficientData {
                needed: MIN_OBSERVATIONS,
                got: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::MissingValues);
        }

        let d = match self.config.d {
            Some(d) => d,
            None => ndiffs(values, self.config.kpss_alpha, self.config.max_d),
        };
        let constant = self.config.with_intercept.unwrap_or(d < 2);
        // Short series cannot support long lags.
        let max_p = self.config.max_p.min(values.len() / 3);
        let max_q = self.config.max_q.min(values.len() / 3);
        debug!(d, constant, max_p, max_q, stepwise = self.config.stepwise, "starting order search");

        let mut search = Search {
            series,
            exog,
            criterion: self.config.criterion,
            conditioning: max_p,
            max_p,
            max_q,
            tried: HashSet::new(),
            scores: Vec::new(),
            best: None,
        };
        if self.config.stepwise {
            self.stepwise(&mut search, d, constant);
        } else {
            self.exhaustive(&mut search, d, constant);
        }

        let Search { mut scores, best, .. } = search;
        scores.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        self.model_scores = scores;

        match best {
            Some((order, score, model)) => {
                debug!(model = %order, constant = order.with_intercept, score, "selected order");
                self.selected_order = Some(order);
                self.selected_model = Some(model);
                Ok(())
            }
            None => {
                self.selected_order = None;
                self.selected_model = None;
                Err(ForecastError::Convergence(format!(
                    "no ARIMA candidate could be fitted (d = {})",
                    d
                )))
            }
        }
    }

    fn model(&self) -> Result<&ARIMA> {
        self.selected_model.as_ref().ok_or(ForecastError::FitRequired)
    }
}

impl Default for AutoARIMA {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for AutoARIMA {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        self.fit_internal(series, None)
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        self.model()?.predict(horizon)
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        self.model()?.predict_with_intervals(horizon, level)
    }

    fn fit_with_exog(&mut self, series: &TimeSeries, exog: &TimeSeries) -> Result<()> {
        self.fit_internal(series, Some(exog))
    }

    fn predict_with_exog(&self, horizon: usize, future: &TimeSeries) -> Result<Forecast> {
        self.model()?.predict_with_exog(horizon, future)
    }

    fn predict_with_exog_intervals(
        &self,
        horizon: usize,
        future: &TimeSeries,
        level: f64,
    ) -> Result<Forecast> {
        self.model()?
            .predict_with_exog_intervals(horizon, future, level)
    }

    fn supports_exog(&self) -> bool {
        true
    }

    fn has_exog(&self) -> bool {
        self.selected_model.as_ref().is_some_and(|m| m.has_exog())
    }

    fn exog_names(&self) -> Option<&[String]> {
        self.selected_model.as_ref()?.exog_names()
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.selected_model.as_ref()?.fitted_values()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.selected_model.as_ref()?.residuals()
    }

    fn name(&self) -> &str {
        "AutoARIMA"
    }
}
