//! Ordinary least squares regression
//!
//! Fits `y ≈ X·w + b` by centring the design matrix and solving the normal
//! equations with a Cholesky factorisation. Rank-deficient systems (for
//! example a feature that is constant over the training rows) are retried
//! with a small ridge term on the diagonal.

use crate::{check_shapes, MathError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Number of ridge escalations tried before giving up on a singular system
const MAX_RIDGE_ATTEMPTS: usize = 6;

/// Fitted least squares model with an intercept term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeastSquares {
    /// One weight per feature column
    coefficients: Vec<f64>,
    /// Bias term
    intercept: f64,
}

impl LeastSquares {
    /// Fit the model on a design matrix and its target vector
    pub fn fit(x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<Self> {
        check_shapes(x.nrows(), y.len())?;

        let x_mean = x.mean_axis(Axis(0)).ok_or_else(|| {
            MathError::InsufficientData("Cannot centre an empty design matrix".to_string())
        })?;
        let y_mean = y.mean().ok_or_else(|| {
            MathError::InsufficientData("Cannot centre an empty target vector".to_string())
        })?;

        let x_centered = &x - &x_mean;
        let y_centered = &y - y_mean;

        let xtx = x_centered.t().dot(&x_centered);
        let xty = x_centered.t().dot(&y_centered);
        let weights = solve_normal_equations(&xtx, &xty)?;

        let intercept = y_mean - weights.dot(&x_mean);

        Ok(Self {
            coefficients: weights.to_vec(),
            intercept,
        })
    }

    /// Predict one value per row of `x`
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.coefficients.len() {
            return Err(MathError::InvalidInput(format!(
                "Expected {} feature columns, got {}",
                self.coefficients.len(),
                x.ncols()
            )));
        }

        let weights = ArrayView1::from(&self.coefficients[..]);
        Ok(x.dot(&weights) + self.intercept)
    }

    /// Fitted feature weights
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Fitted bias term
    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

/// Solve `A·w = b` for a symmetric positive semi-definite `A`.
fn solve_normal_equations(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    if let Some(solution) = cholesky_solve(a, b) {
        return Ok(solution);
    }

    let n = a.nrows();
    let scale = a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
    let mut ridge = 1e-10 * scale.max(1.0);

    for _ in 0..MAX_RIDGE_ATTEMPTS {
        let mut regularized = a.clone();
        for i in 0..n {
            regularized[[i, i]] += ridge;
        }
        if let Some(solution) = cholesky_solve(&regularized, b) {
            return Ok(solution);
        }
        ridge *= 100.0;
    }

    Err(MathError::CalculationError(
        "Normal equations are singular even after ridge regularisation".to_string(),
    ))
}

/// Cholesky solve; `None` when `a` is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L * z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * z[j]).sum();
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T * w = z
    let mut w = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * w[j]).sum();
        w[i] = (z[i] - sum) / l[[i, i]];
    }

    Some(w)
}
