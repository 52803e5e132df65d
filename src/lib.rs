//! # Gridcast
//!
//! `gridcast` bundles the electricity demand forecasting crates:
//!
//! - [`demand_forecast`]: loading, cleaning, calendar features, train/test
//!   splits, the two demand models and hourly forecasts
//! - [`demand_math`]: the least squares and boosted tree kernels behind
//!   those models
//!
//! ## Example
//!
//! ```
//! use gridcast::prelude::*;
//! use chrono::NaiveDate;
//!
//! let monday = NaiveDate::from_ymd_opt(2024, 1, 15)
//!     .and_then(|d| d.and_hms_opt(10, 0, 0))
//!     .unwrap();
//! let features = CalendarFeatures::from_timestamp(monday);
//! assert_eq!(features.hour, 10);
//! assert_eq!(features.weekday, 0);
//! assert!(!features.is_weekend);
//!
//! let future = build_future_table(3, monday, &PlaceholderWeather::default()).unwrap();
//! assert_eq!(future.len(), 72);
//! ```

pub use demand_forecast;
pub use demand_math;

/// Everything needed to go from a CSV file to a forecast
pub mod prelude {
    pub use demand_forecast::features::{derive_calendar_features, normalize, CalendarFeatures, FeatureMatrix};
    pub use demand_forecast::forecast::{
        build_future_table, forecast_demand, predict_history, predict_point, DemandSummary,
        PlaceholderWeather, PointQuery, MAX_FORECAST_DAYS,
    };
    pub use demand_forecast::models::{
        train_model, DemandRegressor, GradientBoostedRegressor, LinearRegressor, ModelHandle,
        ModelKind, TrainedDemandModel,
    };
    pub use demand_forecast::{
        prepare, prepare_with, split, DataLoader, DemandTable, ForecastConfig, ForecastError,
        MissingValuePolicy, PrepareOptions, RegressionMetrics, Split,
    };
    pub use demand_math::BoostingParams;
}
