//! Column names shared by the loader, the feature deriver and the models

/// Timestamp column of the input file
pub const DATE: &str = "Date";
/// Target column of the input file
pub const DEMAND: &str = "Demand";

/// Exogenous weather columns
pub const TEMPERATURE: &str = "Temperature";
pub const HUMIDITY: &str = "Humidity";
pub const WIND_SPEED: &str = "WindSpeed";

/// Calendar columns added by `derive_calendar_features`
pub const HOUR: &str = "Hour";
pub const DAY: &str = "Day";
pub const MONTH: &str = "Month";
pub const WEEKDAY: &str = "Weekday";
pub const IS_WEEKEND: &str = "Is_Weekend";

/// Prediction columns appended for presentation
pub const PREDICTED_DEMAND: &str = "Predicted Demand";
pub const FORECAST_DEMAND: &str = "Forecast Demand";

/// The ordered feature vector every model is trained and queried with
pub const FEATURE_COLUMNS: [&str; 6] = [TEMPERATURE, HUMIDITY, WIND_SPEED, HOUR, WEEKDAY, MONTH];
