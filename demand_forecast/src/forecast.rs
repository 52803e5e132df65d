//! Future forecasts, manual point queries and history predictions
//!
//! Future rows carry [`PlaceholderWeather`]: the same temperature, humidity
//! and wind speed for every hour. That is an approximation, not a weather
//! forecast, and every forecast built here logs a warning saying so.

use crate::columns;
use crate::data::{datetime_series, to_epoch_millis, DemandTable};
use crate::error::{ForecastError, Result};
use crate::features::{derive_calendar_features, FeatureMatrix};
use crate::models::TrainedDemandModel;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Longest forecast horizon accepted by [`forecast_demand`], in days
pub const MAX_FORECAST_DAYS: usize = 7;

/// Constant weather assumed for every future hour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderWeather {
    /// Temperature in °C
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Wind speed in m/s
    pub wind_speed: f64,
}

impl Default for PlaceholderWeather {
    fn default() -> Self {
        Self {
            temperature: 30.0,
            humidity: 40.0,
            wind_speed: 2.0,
        }
    }
}

fn truncate_to_hour(ts: NaiveDateTime) -> Result<NaiveDateTime> {
    ts.date().and_hms_opt(ts.hour(), 0, 0).ok_or_else(|| {
        ForecastError::InvalidArgument(format!("Cannot truncate {} to the hour", ts))
    })
}

fn weather_table(timestamps: &[NaiveDateTime], weather: &PlaceholderWeather) -> Result<DemandTable> {
    let n = timestamps.len();
    let millis = timestamps.iter().map(|&ts| to_epoch_millis(ts)).collect();
    let df = DataFrame::new(vec![
        datetime_series(columns::DATE, millis)?,
        Series::new(columns::TEMPERATURE, vec![weather.temperature; n]),
        Series::new(columns::HUMIDITY, vec![weather.humidity; n]),
        Series::new(columns::WIND_SPEED, vec![weather.wind_speed; n]),
    ])?;
    derive_calendar_features(&DemandTable::from_parts(df, columns::DATE.to_string(), None))
}

/// Build `n_days * 24` hourly rows starting at `reference_time` truncated
/// to the hour, with calendar features and placeholder weather.
pub fn build_future_table(
    n_days: usize,
    reference_time: NaiveDateTime,
    weather: &PlaceholderWeather,
) -> Result<DemandTable> {
    if n_days == 0 {
        return Err(ForecastError::InvalidArgument(
            "Forecast horizon must be at least one day".to_string(),
        ));
    }

    let start = truncate_to_hour(reference_time)?;
    let out_of_range = || {
        ForecastError::InvalidArgument(format!(
            "A {} day horizon from {} is outside the supported date range",
            n_days, start
        ))
    };
    let hours = i64::try_from(n_days)
        .ok()
        .and_then(|days| days.checked_mul(24))
        .ok_or_else(out_of_range)?;
    Duration::try_hours(hours - 1)
        .and_then(|last| start.checked_add_signed(last))
        .ok_or_else(out_of_range)?;
    let timestamps: Vec<NaiveDateTime> = (0..hours)
        .map(|h| {
            Duration::try_hours(h)
                .and_then(|offset| start.checked_add_signed(offset))
                .ok_or_else(out_of_range)
        })
        .collect::<Result<_>>()?;

    debug!(%start, rows = timestamps.len(), "built future table");
    weather_table(&timestamps, weather)
}

/// Forecast hourly demand for the next `n_days` (1 to 7) days.
///
/// Returns the future table with a `Forecast Demand` column.
pub fn forecast_demand<M: TrainedDemandModel + ?Sized>(
    model: &M,
    n_days: usize,
    reference_time: NaiveDateTime,
    weather: &PlaceholderWeather,
) -> Result<DemandTable> {
    if !(1..=MAX_FORECAST_DAYS).contains(&n_days) {
        return Err(ForecastError::InvalidArgument(format!(
            "Forecast horizon must be between 1 and {} days, got {}",
            MAX_FORECAST_DAYS, n_days
        )));
    }

    warn!(
        temperature = weather.temperature,
        humidity = weather.humidity,
        wind_speed = weather.wind_speed,
        "forecast uses constant placeholder weather, not a weather forecast"
    );

    let table = build_future_table(n_days, reference_time, weather)?;
    let predictions = model.predict(&FeatureMatrix::from_table(&table)?)?;

    info!(model = model.name(), days = n_days, rows = table.len(), "forecast demand");
    table.with_column(Series::new(columns::FORECAST_DEMAND, predictions))
}

/// Predict demand for every row of a prepared table.
///
/// Returns the table with calendar features and a `Predicted Demand` column.
pub fn predict_history<M: TrainedDemandModel + ?Sized>(
    model: &M,
    table: &DemandTable,
) -> Result<DemandTable> {
    let table = derive_calendar_features(table)?;
    let predictions = model.predict(&FeatureMatrix::from_table(&table)?)?;
    info!(model = model.name(), rows = table.len(), "predicted history");
    table.with_column(Series::new(columns::PREDICTED_DEMAND, predictions))
}

/// Inputs for a single manual prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointQuery {
    pub date: NaiveDate,
    /// Hour of day, 0-23
    pub hour: u32,
    pub temperature: f64,
    /// Relative humidity, 0-100
    pub humidity: f64,
    /// Non-negative wind speed
    pub wind_speed: f64,
}

impl PointQuery {
    pub fn validate(&self) -> Result<()> {
        if self.hour > 23 {
            return Err(ForecastError::InvalidArgument(format!(
                "Hour must be between 0 and 23, got {}",
                self.hour
            )));
        }
        for (label, value) in [
            ("Temperature", self.temperature),
            ("Humidity", self.humidity),
            ("Wind speed", self.wind_speed),
        ] {
            if !value.is_finite() {
                return Err(ForecastError::InvalidArgument(format!(
                    "{} must be a finite number",
                    label
                )));
            }
        }
        if !(0.0..=100.0).contains(&self.humidity) {
            return Err(ForecastError::InvalidArgument(format!(
                "Humidity must be between 0 and 100, got {}",
                self.humidity
            )));
        }
        if self.wind_speed < 0.0 {
            return Err(ForecastError::InvalidArgument(format!(
                "Wind speed must be non-negative, got {}",
                self.wind_speed
            )));
        }
        Ok(())
    }

    /// Timestamp the query refers to
    pub fn timestamp(&self) -> Result<NaiveDateTime> {
        self.date.and_hms_opt(self.hour, 0, 0).ok_or_else(|| {
            ForecastError::InvalidArgument(format!("Invalid hour {}", self.hour))
        })
    }
}

/// Predict demand for a single manually entered point
pub fn predict_point<M: TrainedDemandModel + ?Sized>(model: &M, query: &PointQuery) -> Result<f64> {
    query.validate()?;
    let weather = PlaceholderWeather {
        temperature: query.temperature,
        humidity: query.humidity,
        wind_speed: query.wind_speed,
    };
    let table = weather_table(&[query.timestamp()?], &weather)?;
    let predictions = model.predict(&FeatureMatrix::from_table(&table)?)?;

    predictions.first().copied().ok_or_else(|| {
        ForecastError::InvalidArgument("Model returned no prediction".to_string())
    })
}

/// Headline statistics of observed demand
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandSummary {
    pub peak: f64,
    pub minimum: f64,
    pub mean: f64,
    /// First timestamp at which the peak occurs
    pub peak_time: NaiveDateTime,
    pub observations: usize,
}

impl DemandSummary {
    pub fn from_table(table: &DemandTable) -> Result<Self> {
        let demand = table.targets()?;
        let timestamps = table.timestamps()?;
        if demand.is_empty() {
            return Err(ForecastError::InvalidArgument(
                "Cannot summarise an empty table".to_string(),
            ));
        }

        let mut peak_idx = 0;
        let mut minimum = demand[0];
        for (i, &d) in demand.iter().enumerate() {
            if d > demand[peak_idx] {
                peak_idx = i;
            }
            minimum = minimum.min(d);
        }

        Ok(Self {
            peak: demand[peak_idx],
            minimum,
            mean: demand.iter().sum::<f64>() / demand.len() as f64,
            peak_time: timestamps[peak_idx],
            observations: demand.len(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ForecastRecord {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Forecast Demand")]
    demand: f64,
}

/// Export the timestamps and `Forecast Demand` column of a forecast table
pub fn write_forecast_csv<P: AsRef<Path>>(forecast: &DemandTable, path: P) -> Result<()> {
    let path = path.as_ref();
    let timestamps = forecast.timestamps()?;
    let demand = forecast.required_f64(columns::FORECAST_DEMAND)?;

    let mut writer = csv::Writer::from_path(path)?;
    for (ts, demand) in timestamps.iter().zip(demand) {
        writer.serialize(ForecastRecord {
            date: ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            demand,
        })?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = timestamps.len(), "wrote forecast");
    Ok(())
}
