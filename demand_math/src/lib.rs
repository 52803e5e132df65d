//! # Demand Math
//!
//! Numerical kernels behind the demand regression models.
//! This crate provides an ordinary least squares solver, a squared-error
//! regression tree and a gradient-boosted ensemble of those trees. All
//! kernels work on dense `ndarray` matrices and know nothing about tables
//! or column names.

use thiserror::Error;

// Kernel modules
pub mod boosting;
pub mod linear;
pub mod tree;

pub use boosting::{BoostedTrees, BoostingParams};
pub use linear::LeastSquares;
pub use tree::{RegressionTree, TreeNode, TreeParams};

/// Errors that can occur in regression calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for regression math operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Check that a design matrix and target vector describe the same samples.
pub(crate) fn check_shapes(n_rows: usize, n_targets: usize) -> Result<()> {
    if n_rows != n_targets {
        return Err(MathError::InvalidInput(format!(
            "Feature rows ({}) and targets ({}) differ in length",
            n_rows, n_targets
        )));
    }
    if n_rows == 0 {
        return Err(MathError::InsufficientData(
            "Cannot fit on an empty sample".to_string(),
        ));
    }
    Ok(())
}
