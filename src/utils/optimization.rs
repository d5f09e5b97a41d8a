//! Derivative-free optimization used for ARIMA parameter estimation.

use std::cmp::Ordering;

/// Result of Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// The optimal point found.
    pub optimal_point: Vec<f64>,
    /// The objective function value at the optimal point.
    pub optimal_value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the simplex met both tolerances before `max_iter`.
    pub converged: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Relative tolerance on the spread of objective values.
    pub tolerance: f64,
    /// Absolute tolerance on the simplex size, per coordinate.
    pub x_tolerance: f64,
    /// Reflection coefficient (default: 1.0).
    pub alpha: f64,
    /// Expansion coefficient (default: 2.0).
    pub gamma: f64,
    /// Contraction coefficient (default: 0.5).
    pub rho: f64,
    /// Shrinkage coefficient (default: 0.5).
    pub sigma: f64,
    /// Initial simplex step size (default: 0.1).
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            tolerance: 1e-9,
            x_tolerance: 1e-4,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.1,
        }
    }
}

/// Minimize `objective` with the Nelder-Mead simplex method.
///
/// Non-finite objective values are treated as `+inf`, so infeasible regions
/// simply repel the simplex. Points are clamped to `bounds` when given.
///
/// # Example
/// ```
/// use enrollment_forecast::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// // Minimize (x-2)^2 + (y-3)^2
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     &NelderMeadConfig::default(),
/// );
///
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 2.0).abs() < 0.01);
/// assert!((result.optimal_point[1] - 3.0).abs() < 0.01);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    let eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    if n == 0 {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: eval(&[]),
            iterations: 0,
            converged: true,
        };
    }

    let start = apply_bounds(initial, bounds);
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(start.clone());
    for i in 0..n {
        let mut vertex = start.clone();
        let step = if start[i].abs() > 1e-8 {
            config.initial_step * start[i].abs()
        } else {
            config.initial_step
        };
        vertex[i] += step;
        let mut bounded = apply_bounds(&vertex, bounds);
        if bounded[i] == start[i] {
            // Stepped onto a bound; go the other way instead.
            vertex[i] = start[i] - step;
            bounded = apply_bounds(&vertex, bounds);
        }
        simplex.push(bounded);
    }

    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        // Equal values alone do not mean convergence: the vertices may
        // straddle the minimum.
        let spread = values[worst] - values[best];
        let size = simplex_size(&simplex, best);
        if spread.is_finite()
            && spread <= config.tolerance * (1.0 + values[best].abs())
            && size <= config.x_tolerance
        {
            converged = true;
            break;
        }

        let centroid = centroid_excluding(&simplex, worst);

        let reflected = apply_bounds(&towards(&centroid, &simplex[worst], -config.alpha), bounds);
        let reflected_value = eval(&reflected);

        if reflected_value < values[best] {
            let expanded = apply_bounds(&towards(&centroid, &reflected, config.gamma), bounds);
            let expanded_value = eval(&expanded);
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
            continue;
        }

        let (contracted, contracted_value) = if reflected_value < values[worst] {
            let c = apply_bounds(&towards(&centroid, &reflected, config.rho), bounds);
            let v = eval(&c);
            (c, v)
        } else {
            let c = apply_bounds(&towards(&centroid, &simplex[worst], config.rho), bounds);
            let v = eval(&c);
            (c, v)
        };

        if contracted_value < values[worst].min(reflected_value) {
            simplex[worst] = contracted;
            values[worst] = contracted_value;
            continue;
        }

        let anchor = simplex[best].clone();
        for i in 0..=n {
            if i == best {
                continue;
            }
            let shrunk = towards(&anchor, &simplex[i], config.sigma);
            simplex[i] = apply_bounds(&shrunk, bounds);
            values[i] = eval(&simplex[i]);
        }
    }

    let best = values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    NelderMeadResult {
        optimal_point: simplex[best].clone(),
        optimal_value: values[best],
        iterations,
        converged,
    }
}

/// Run Nelder-Mead, restarting from the best point while the previous run
/// stopped on `max_iter`. A restart rebuilds the simplex, which recovers
/// from the degenerate simplices common with bounded coefficients.
pub fn nelder_mead_with_restarts<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &NelderMeadConfig,
    restarts: usize,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let mut result = nelder_mead(&objective, initial, bounds, config);
    let mut total_iterations = result.iterations;
    for _ in 0..restarts {
        if result.converged {
            break;
        }
        tracing::warn!(
            iterations = result.iterations,
            value = result.optimal_value,
            "nelder-mead stopped before converging, restarting from best point"
        );
        let next = nelder_mead(&objective, &result.optimal_point, bounds, config);
        total_iterations += next.iterations;
        if next.optimal_value <= result.optimal_value || next.converged {
            result = next;
        }
    }
    result.iterations = total_iterations;
    result
}

fn centroid_excluding(simplex: &[Vec<f64>], exclude: usize) -> Vec<f64> {
    let n = simplex[0].len();
    let count = (simplex.len() - 1) as f64;
    let mut centroid = vec![0.0; n];
    for (i, vertex) in simplex.iter().enumerate() {
        if i != exclude {
            for (c, v) in centroid.iter_mut().zip(vertex) {
                *c += v;
            }
        }
    }
    for c in &mut centroid {
        *c /= count;
    }
    centroid
}

/// `origin + coef * (point - origin)`; a negative `coef` reflects through `origin`.
fn towards(origin: &[f64], point: &[f64], coef: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(point)
        .map(|(o, p)| o + coef * (p - o))
        .collect()
}

fn apply_bounds(point: &[f64], bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    match bounds {
        None => point.to_vec(),
        Some(b) => point
            .iter()
            .enumerate()
            .map(|(i, &x)| match b.get(i) {
                Some(&(lo, hi)) => x.clamp(lo, hi),
                None => x,
            })
            .collect(),
    }
}

/// Largest coordinate distance from the best vertex.
fn simplex_size(simplex: &[Vec<f64>], best: usize) -> f64 {
    simplex
        .iter()
        .flat_map(|vertex| vertex.iter().zip(&simplex[best]).map(|(x, b)| (x - b).abs()))
        .fold(0.0, f64::max)
}
