//! # Demand Forecast
//!
//! Feature engineering, regression models and hourly forecasts for
//! electricity demand.
//!
//! ## Pipeline
//!
//! - Load a CSV with `Date` and `Demand` columns (plus `Temperature`,
//!   `Humidity` and `WindSpeed`) and clean it into a time-ordered table
//! - Derive calendar features (hour, day, month, weekday, weekend flag)
//! - Split into seeded train and test sets
//! - Train a linear model or a gradient-boosted tree ensemble, evaluate it
//!   by RMSE and persist it as a JSON artifact
//! - Forecast up to seven days ahead, predict a single manual point, or
//!   predict over the historical table
//!
//! Weekdays follow the Monday = 0 convention throughout.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use demand_forecast::features::{derive_calendar_features, FeatureMatrix};
//! use demand_forecast::forecast::{forecast_demand, PlaceholderWeather};
//! use demand_forecast::models::{train_model, ModelKind, TrainedDemandModel};
//! use demand_forecast::{split, DataLoader, PrepareOptions};
//! use demand_math::BoostingParams;
//!
//! # fn main() -> demand_forecast::Result<()> {
//! // Load and clean data
//! let table = DataLoader::load_prepared("data/processed/cleaned_data.csv", &PrepareOptions::default())?;
//! let table = derive_calendar_features(&table)?;
//!
//! // Train on 80% of the rows and report RMSE on the rest
//! let parts = split(&table, "Demand", 0.2, 42)?;
//! let x_train = FeatureMatrix::from_frame(&parts.x_train)?;
//! let x_test = FeatureMatrix::from_frame(&parts.x_test)?;
//! let model = train_model(ModelKind::GradientBoosted, &x_train, &parts.y_train, &BoostingParams::default())?;
//! println!("RMSE: {:.2}", model.evaluate(&x_test, &parts.y_test)?);
//!
//! // Persist, then forecast three days ahead
//! model.persist("models/xgb_model.json")?;
//! let start = chrono::Local::now().naive_local();
//! let forecast = forecast_demand(&model, 3, start, &PlaceholderWeather::default())?;
//! assert_eq!(forecast.len(), 72);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod columns;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod forecast;
pub mod metrics;
pub mod models;
pub mod split;

// Re-export commonly used types
pub use crate::cache::{LoadCache, ModelCache, TableCache};
pub use crate::config::ForecastConfig;
pub use crate::data::{
    prepare, prepare_with, DataLoader, DemandTable, MissingValuePolicy, PrepareOptions, RawTable,
};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{derive_calendar_features, normalize, CalendarFeatures, FeatureMatrix};
pub use crate::forecast::{
    build_future_table, forecast_demand, predict_history, predict_point, DemandSummary,
    PlaceholderWeather, PointQuery,
};
pub use crate::metrics::{rmse, RegressionMetrics};
pub use crate::models::{
    DemandRegressor, ModelHandle, ModelKind, TrainedDemandModel,
};
pub use crate::split::{split, Split};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
