//! Linear regression model

use crate::error::Result;
use crate::features::FeatureMatrix;
use crate::models::{check_training_input, DemandRegressor, TrainedDemandModel};
use demand_math::LeastSquares;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Ordinary least squares regression with an intercept
#[derive(Debug, Clone)]
pub struct LinearRegressor {
    name: String,
}

/// Trained linear regression model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedLinear {
    name: String,
    feature_columns: Vec<String>,
    fit: LeastSquares,
}

impl LinearRegressor {
    /// Create a new linear regressor
    pub fn new() -> Self {
        Self {
            name: "Linear Regression".to_string(),
        }
    }
}

impl Default for LinearRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl DemandRegressor for LinearRegressor {
    type Trained = TrainedLinear;

    fn train(&self, features: &FeatureMatrix, targets: &[f64]) -> Result<Self::Trained> {
        check_training_input(features, targets)?;
        let fit = LeastSquares::fit(features.values(), ArrayView1::from(targets))?;

        Ok(TrainedLinear {
            name: self.name.clone(),
            feature_columns: features.columns().to_vec(),
            fit,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedLinear {
    /// Weight per feature column, in [`TrainedDemandModel::feature_columns`] order
    pub fn coefficients(&self) -> &[f64] {
        self.fit.coefficients()
    }

    pub fn intercept(&self) -> f64 {
        self.fit.intercept()
    }
}

impl TrainedDemandModel for TrainedLinear {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        features.check_schema(&self.feature_columns)?;
        Ok(self.fit.predict(features.values())?.to_vec())
    }
}
