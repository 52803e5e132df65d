//! Gradient-boosted regression trees
//!
//! Squared-error boosting: start from the target mean, then repeatedly fit a
//! [`RegressionTree`] to the current residuals and add a shrunken copy of it
//! to the ensemble.

use crate::tree::{RegressionTree, TreeParams};
use crate::{check_shapes, MathError, Result};
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Shrinkage applied to every tree
    pub learning_rate: f64,
    /// Fraction of rows sampled for each tree
    pub subsample: f64,
    /// Seed for row subsampling
    pub seed: u64,
    /// Per-tree growth limits
    pub tree: TreeParams,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            subsample: 1.0,
            seed: 42,
            tree: TreeParams::default(),
        }
    }
}

impl BoostingParams {
    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(MathError::InvalidInput(
                "Number of estimators must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(MathError::InvalidInput(format!(
                "Learning rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(MathError::InvalidInput(format!(
                "Subsample ratio must be in (0, 1], got {}",
                self.subsample
            )));
        }
        Ok(())
    }
}

/// Fitted ensemble of boosted regression trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedTrees {
    params: BoostingParams,
    base_score: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl BoostedTrees {
    /// Fit the ensemble on a design matrix and its targets
    pub fn fit(x: ArrayView2<f64>, y: &[f64], params: &BoostingParams) -> Result<Self> {
        check_shapes(x.nrows(), y.len())?;
        params.validate()?;

        let n = y.len();
        let base_score = y.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![base_score; n];
        let mut residuals = vec![0.0; n];
        let mut trees = Vec::with_capacity(params.n_estimators);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let sample_size = ((n as f64) * params.subsample).ceil().max(1.0) as usize;
        let mut all_rows: Vec<usize> = (0..n).collect();

        for _ in 0..params.n_estimators {
            for i in 0..n {
                residuals[i] = y[i] - predictions[i];
            }

            let rows = if sample_size < n {
                all_rows.shuffle(&mut rng);
                let mut sampled = all_rows[..sample_size].to_vec();
                sampled.sort_unstable();
                sampled
            } else {
                all_rows.clone()
            };

            let tree = RegressionTree::fit(x, &residuals, &rows, &params.tree)?;
            let update = tree.predict(x)?;
            for (p, u) in predictions.iter_mut().zip(update) {
                *p += params.learning_rate * u;
            }
            trees.push(tree);
        }

        Ok(Self {
            params: params.clone(),
            base_score,
            trees,
            n_features: x.ncols(),
        })
    }

    /// Predict one value per row of `x`
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<f64>> {
        if x.ncols() != self.n_features {
            return Err(MathError::InvalidInput(format!(
                "Expected {} feature columns, got {}",
                self.n_features,
                x.ncols()
            )));
        }

        let mut predictions = vec![self.base_score; x.nrows()];
        for tree in &self.trees {
            for (p, u) in predictions.iter_mut().zip(tree.predict(x)?) {
                *p += self.params.learning_rate * u;
            }
        }
        Ok(predictions)
    }

    /// Hyperparameters the ensemble was fitted with
    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    /// Number of fitted trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Starting prediction before any tree is applied
    pub fn base_score(&self) -> f64 {
        self.base_score
    }
}
