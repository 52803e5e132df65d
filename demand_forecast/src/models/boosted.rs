//! Gradient-boosted tree model

use crate::error::Result;
use crate::features::FeatureMatrix;
use crate::models::{check_training_input, DemandRegressor, TrainedDemandModel};
use demand_math::{BoostedTrees, BoostingParams};
use serde::{Deserialize, Serialize};

/// Gradient-boosted regression trees
#[derive(Debug, Clone)]
pub struct GradientBoostedRegressor {
    name: String,
    params: BoostingParams,
}

/// Trained gradient-boosted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedBoosted {
    name: String,
    feature_columns: Vec<String>,
    ensemble: BoostedTrees,
}

impl GradientBoostedRegressor {
    /// Create a regressor with the given boosting parameters
    pub fn new(params: BoostingParams) -> Self {
        Self {
            name: "XGBoost".to_string(),
            params,
        }
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }
}

impl Default for GradientBoostedRegressor {
    fn default() -> Self {
        Self::new(BoostingParams::default())
    }
}

impl DemandRegressor for GradientBoostedRegressor {
    type Trained = TrainedBoosted;

    fn train(&self, features: &FeatureMatrix, targets: &[f64]) -> Result<Self::Trained> {
        check_training_input(features, targets)?;
        let ensemble = BoostedTrees::fit(features.values(), targets, &self.params)?;

        Ok(TrainedBoosted {
            name: self.name.clone(),
            feature_columns: features.columns().to_vec(),
            ensemble,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedBoosted {
    /// Number of trees in the ensemble
    pub fn n_trees(&self) -> usize {
        self.ensemble.n_trees()
    }
}

impl TrainedDemandModel for TrainedBoosted {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        features.check_schema(&self.feature_columns)?;
        Ok(self.ensemble.predict(features.values())?)
    }
}
