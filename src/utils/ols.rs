//! Ordinary Least Squares regression, used for starting values of the
//! regression coefficients in ARIMA models with exogenous regressors.

use crate::error::{ForecastError, Result};

/// OLS regression coefficients and intercept.
#[derive(Debug, Clone, PartialEq)]
pub struct OLSResult {
    /// Regression coefficients, one per regressor column.
    pub coefficients: Vec<f64>,
    /// Intercept term (0 when fitted without one).
    pub intercept: f64,
}

impl OLSResult {
    /// Predict `intercept + Σ coef_j * x_j` for each observation.
    pub fn predict(&self, columns: &[&[f64]]) -> Result<Vec<f64>> {
        if columns.len() != self.coefficients.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.coefficients.len(),
                got: columns.len(),
            });
        }
        let n = columns.first().map(|c| c.len()).unwrap_or(0);
        for col in columns {
            if col.len() != n {
                return Err(ForecastError::DimensionMismatch {
                    expected: n,
                    got: col.len(),
                });
            }
        }

        let mut predictions = vec![self.intercept; n];
        for (coef, col) in self.coefficients.iter().zip(columns) {
            for (pred, x) in predictions.iter_mut().zip(col.iter()) {
                *pred += coef * x;
            }
        }
        Ok(predictions)
    }

    /// Get the number of regressors.
    pub fn num_regressors(&self) -> usize {
        self.coefficients.len()
    }
}

/// Fit `y = intercept + X @ coefficients` by solving the normal equations
/// with a Cholesky decomposition.
///
/// A tiny ridge term keeps collinear designs (e.g. a differenced linear
/// trend next to the intercept) solvable; the solution then splits the
/// shared effect between the collinear columns.
pub fn ols_fit(y: &[f64], columns: &[&[f64]], intercept: bool) -> Result<OLSResult> {
    let n = y.len();
    if n == 0 {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    for col in columns {
        if col.len() != n {
            return Err(ForecastError::DimensionMismatch {
                expected: n,
                got: col.len(),
            });
        }
    }

    let offset = usize::from(intercept);
    let k = columns.len() + offset;
    if k == 0 {
        return Ok(OLSResult {
            coefficients: vec![],
            intercept: 0.0,
        });
    }

    let design = |obs: usize, j: usize| -> f64 {
        if intercept && j == 0 {
            1.0
        } else {
            columns[j - offset][obs]
        }
    };

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for obs in 0..n {
        for i in 0..k {
            let xi = design(obs, i);
            xty[i] += xi * y[obs];
            for j in 0..=i {
                xtx[i][j] += xi * design(obs, j);
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
        xtx[i][i] += 1e-8 * (1.0 + xtx[i][i]);
    }

    let beta = solve_symmetric(&xtx, &xty).ok_or_else(|| {
        ForecastError::ComputationError(
            "OLS regression failed: matrix not positive definite".into(),
        )
    })?;

    Ok(OLSResult {
        intercept: if intercept { beta[0] } else { 0.0 },
        coefficients: beta[offset..].to_vec(),
    })
}

/// Solve `A @ x = b` for symmetric positive definite `A`.
fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * z[j];
        }
        z[i] = sum / l[i][i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = z[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}
