//! Regression models for demand prediction
//!
//! A model is configured as a [`DemandRegressor`], trained on a
//! [`FeatureMatrix`] into a [`TrainedDemandModel`], and persisted as a
//! [`ModelHandle`]. Prediction consumers only ever see the trained trait, so
//! any variant can be swapped in behind it.

use crate::error::{ForecastError, Result};
use crate::features::FeatureMatrix;
use crate::metrics::rmse;
use demand_math::BoostingParams;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub mod boosted;
pub mod linear;

pub use boosted::{GradientBoostedRegressor, TrainedBoosted};
pub use linear::{LinearRegressor, TrainedLinear};

/// Version written into every artifact; bumped when the layout changes
pub const ARTIFACT_VERSION: u32 = 1;

/// Trained model that can predict demand
pub trait TrainedDemandModel: Debug + Send + Sync {
    /// Name of the model
    fn name(&self) -> &str;

    /// Feature columns the model was trained on, in order
    fn feature_columns(&self) -> &[String];

    /// Predict one demand value per feature row
    ///
    /// Fails with [`ForecastError::SchemaMismatch`] when `features` does not
    /// have the training columns in the training order.
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>>;

    /// Root mean squared error of the predictions for `features`
    fn evaluate(&self, features: &FeatureMatrix, targets: &[f64]) -> Result<f64> {
        let predictions = self.predict(features)?;
        rmse(targets, &predictions)
    }
}

/// Regression model that can be trained on demand features
pub trait DemandRegressor: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedDemandModel;

    /// Train the model on a feature matrix and its targets
    fn train(&self, features: &FeatureMatrix, targets: &[f64]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// The two model variants, addressed by their display names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Ordinary least squares
    Linear,
    /// Gradient-boosted regression trees
    GradientBoosted,
}

impl ModelKind {
    /// Every variant, in display order
    pub const ALL: [ModelKind; 2] = [ModelKind::Linear, ModelKind::GradientBoosted];

    /// Display name used as the lookup key
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Linear => "Linear Regression",
            ModelKind::GradientBoosted => "XGBoost",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear regression" | "linear" | "ols" => Ok(ModelKind::Linear),
            "xgboost" | "gbm" | "gradient boosting" | "boosted" => Ok(ModelKind::GradientBoosted),
            _ => Err(ForecastError::InvalidArgument(format!(
                "Unknown model '{}'; expected one of: {}",
                s,
                ModelKind::ALL
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

/// Any trained model variant, in its persistable form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "model")]
pub enum ModelHandle {
    Linear(TrainedLinear),
    GradientBoosted(TrainedBoosted),
}

#[derive(Serialize, Deserialize)]
struct Artifact {
    version: u32,
    handle: ModelHandle,
}

impl ModelHandle {
    /// Which variant this handle holds
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelHandle::Linear(_) => ModelKind::Linear,
            ModelHandle::GradientBoosted(_) => ModelKind::GradientBoosted,
        }
    }

    /// Write the model to `path` as JSON, creating parent directories
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(
            writer,
            &Artifact {
                version: ARTIFACT_VERSION,
                handle: self.clone(),
            },
        )?;

        info!(model = self.name(), path = %path.display(), "persisted model");
        Ok(())
    }

    /// Read a model previously written by [`ModelHandle::persist`]
    pub fn restore<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForecastError::ArtifactNotFound(path.to_path_buf()));
        }

        let reader = BufReader::new(File::open(path)?);
        let artifact: Artifact = serde_json::from_reader(reader)?;
        if artifact.version != ARTIFACT_VERSION {
            return Err(ForecastError::Serialization(format!(
                "Artifact {} has version {}, expected {}",
                path.display(),
                artifact.version,
                ARTIFACT_VERSION
            )));
        }

        info!(model = artifact.handle.name(), path = %path.display(), "restored model");
        Ok(artifact.handle)
    }

    fn inner(&self) -> &dyn TrainedDemandModel {
        match self {
            ModelHandle::Linear(model) => model,
            ModelHandle::GradientBoosted(model) => model,
        }
    }
}

impl TrainedDemandModel for ModelHandle {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn feature_columns(&self) -> &[String] {
        self.inner().feature_columns()
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        self.inner().predict(features)
    }
}

impl From<TrainedLinear> for ModelHandle {
    fn from(model: TrainedLinear) -> Self {
        ModelHandle::Linear(model)
    }
}

impl From<TrainedBoosted> for ModelHandle {
    fn from(model: TrainedBoosted) -> Self {
        ModelHandle::GradientBoosted(model)
    }
}

/// Train the variant named by `kind`
pub fn train_model(
    kind: ModelKind,
    features: &FeatureMatrix,
    targets: &[f64],
    boosting: &BoostingParams,
) -> Result<ModelHandle> {
    let handle: ModelHandle = match kind {
        ModelKind::Linear => LinearRegressor::new().train(features, targets)?.into(),
        ModelKind::GradientBoosted => GradientBoostedRegressor::new(boosting.clone())
            .train(features, targets)?
            .into(),
    };
    info!(model = handle.name(), rows = features.nrows(), "trained model");
    Ok(handle)
}

/// Shared training input checks
pub(crate) fn check_training_input(features: &FeatureMatrix, targets: &[f64]) -> Result<()> {
    if features.nrows() != targets.len() {
        return Err(ForecastError::InvalidArgument(format!(
            "{} feature rows but {} targets",
            features.nrows(),
            targets.len()
        )));
    }
    if targets.is_empty() {
        return Err(ForecastError::InvalidArgument(
            "Cannot train on an empty dataset".to_string(),
        ));
    }
    if let Some(bad) = targets.iter().position(|t| !t.is_finite()) {
        return Err(ForecastError::InvalidArgument(format!(
            "Target at row {} is not finite",
            bad
        )));
    }
    Ok(())
}
