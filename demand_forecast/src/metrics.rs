//! Metrics for evaluating demand predictions

use crate::error::{ForecastError, Result};
use std::fmt;

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::InvalidArgument(format!(
            "Actual ({}) and predicted ({}) values must have the same non-zero length",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

/// Root mean squared error between actual and predicted values
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let mse = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64;
    Ok(mse.sqrt())
}

/// Accuracy metrics for a regression model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Coefficient of determination; `NaN` when the actual values are constant
    pub r2: f64,
}

impl RegressionMetrics {
    /// Compute all metrics for one prediction batch
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        check_lengths(actual, predicted)?;
        let n = actual.len() as f64;

        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        for (a, p) in actual.iter().zip(predicted) {
            abs_sum += (a - p).abs();
            sq_sum += (a - p).powi(2);
        }

        let mean = actual.iter().sum::<f64>() / n;
        let total: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
        let r2 = if total > 0.0 {
            1.0 - sq_sum / total
        } else {
            f64::NAN
        };

        let mse = sq_sum / n;
        Ok(Self {
            mae: abs_sum / n,
            mse,
            rmse: mse.sqrt(),
            r2,
        })
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RMSE {:.2} | MAE {:.2} | MSE {:.2} | R² {:.4}",
            self.rmse, self.mae, self.mse, self.r2
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rmse_of_known_errors() {
        // errors 1, -1, 3, -3 → mse 5
        let actual = [10.0, 20.0, 30.0, 40.0];
        let predicted = [9.0, 21.0, 27.0, 43.0];
        assert_relative_eq!(rmse(&actual, &predicted).unwrap(), 5f64.sqrt());
    }

    #[test]
    fn perfect_predictions() {
        let actual = [1.0, 2.0, 3.0];
        let metrics = RegressionMetrics::compute(&actual, &actual).unwrap();
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.mae, 0.0);
        assert_relative_eq!(metrics.r2, 1.0);
    }

    #[test]
    fn constant_actuals_have_undefined_r2() {
        let metrics = RegressionMetrics::compute(&[5.0, 5.0], &[4.0, 6.0]).unwrap();
        assert_relative_eq!(metrics.mae, 1.0);
        assert!(metrics.r2.is_nan());
    }

    #[test]
    fn rejects_mismatched_lengths() {
        assert!(rmse(&[1.0], &[1.0, 2.0]).is_err());
        assert!(rmse(&[], &[]).is_err());
    }
}
