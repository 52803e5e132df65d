//! Pipeline configuration

use crate::columns;
use crate::data::{MissingValuePolicy, PrepareOptions};
use crate::error::{ForecastError, Result};
use crate::forecast::PlaceholderWeather;
use crate::models::ModelKind;
use demand_math::BoostingParams;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Paths, column names and training settings for the whole pipeline
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Cleaned data used for training and summaries
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Directory holding the model artifacts
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    #[serde(default = "default_linear_artifact")]
    pub linear_artifact: String,

    #[serde(default = "default_boosted_artifact")]
    pub boosted_artifact: String,

    #[serde(default = "default_date_column")]
    pub date_column: String,

    #[serde(default = "default_target_column")]
    pub target_column: String,

    /// Fill gaps in weather columns instead of dropping incomplete rows
    #[serde(default)]
    pub fill_missing: bool,

    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    /// Seed for the train/test shuffle
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub boosting: BoostingParams,

    /// Weather assumed for future hours
    #[serde(default)]
    pub weather: PlaceholderWeather,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/processed/cleaned_data.csv")
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_linear_artifact() -> String {
    "lr_model.json".to_string()
}

fn default_boosted_artifact() -> String {
    "xgb_model.json".to_string()
}

fn default_date_column() -> String {
    columns::DATE.to_string()
}

fn default_target_column() -> String {
    columns::DEMAND.to_string()
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            models_dir: default_models_dir(),
            linear_artifact: default_linear_artifact(),
            boosted_artifact: default_boosted_artifact(),
            date_column: default_date_column(),
            target_column: default_target_column(),
            fill_missing: false,
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            boosting: BoostingParams::default(),
            weather: PlaceholderWeather::default(),
        }
    }
}

impl ForecastConfig {
    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForecastError::ArtifactNotFound(path.to_path_buf()));
        }

        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ForecastError::InvalidArgument(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.date_column == self.target_column {
            return Err(ForecastError::InvalidArgument(
                "date_column and target_column must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Artifact path for a model variant
    pub fn model_path(&self, kind: ModelKind) -> PathBuf {
        let file = match kind {
            ModelKind::Linear => &self.linear_artifact,
            ModelKind::GradientBoosted => &self.boosted_artifact,
        };
        self.models_dir.join(file)
    }

    /// Preparation options matching the configured columns and policy
    pub fn prepare_options(&self) -> PrepareOptions {
        PrepareOptions {
            time_column: self.date_column.clone(),
            target_column: self.target_column.clone(),
            missing_values: if self.fill_missing {
                MissingValuePolicy::FillExogenous
            } else {
                MissingValuePolicy::DropAnyNull
            },
        }
    }
}
