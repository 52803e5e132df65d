//! Feature derivation shared by training and inference
//!
//! Every path that feeds a model (training split, history prediction,
//! future forecast, manual query) goes through [`derive_calendar_features`]
//! and [`FeatureMatrix::from_table`], so the feature vector is computed by
//! exactly one piece of code.

use crate::columns;
pub use crate::columns::FEATURE_COLUMNS;
use crate::data::{require_column, series_to_f64, DemandTable};
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDateTime, Timelike};
use ndarray::{Array2, ArrayView2};
use polars::prelude::*;
use statrs::statistics::Statistics;
use tracing::debug;

/// Calendar fields derived from a single timestamp
///
/// Weekdays count from Monday = 0 to Sunday = 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFeatures {
    /// Hour of day (0-23)
    pub hour: u32,
    /// Day of month (1-31)
    pub day: u32,
    /// Month (1-12)
    pub month: u32,
    /// Day of week (0 = Monday, 6 = Sunday)
    pub weekday: u32,
    /// Saturday or Sunday
    pub is_weekend: bool,
}

impl CalendarFeatures {
    /// Derive the calendar fields of a timestamp
    pub fn from_timestamp(ts: NaiveDateTime) -> Self {
        let weekday = ts.weekday().num_days_from_monday();
        Self {
            hour: ts.hour(),
            day: ts.day(),
            month: ts.month(),
            weekday,
            is_weekend: weekday >= 5,
        }
    }
}

/// Return a copy of `table` with `Hour`, `Day`, `Month`, `Weekday` and
/// `Is_Weekend` columns derived from its timestamps.
///
/// Existing calendar columns are overwritten, so calling this twice yields
/// the same table as calling it once.
pub fn derive_calendar_features(table: &DemandTable) -> Result<DemandTable> {
    let calendar: Vec<CalendarFeatures> = table
        .timestamps()?
        .into_iter()
        .map(CalendarFeatures::from_timestamp)
        .collect();

    let as_i32 = |f: fn(&CalendarFeatures) -> u32| -> Vec<i32> {
        calendar.iter().map(|c| f(c) as i32).collect()
    };

    let derived = table
        .with_column(Series::new(columns::HOUR, as_i32(|c| c.hour)))?
        .with_column(Series::new(columns::DAY, as_i32(|c| c.day)))?
        .with_column(Series::new(columns::MONTH, as_i32(|c| c.month)))?
        .with_column(Series::new(columns::WEEKDAY, as_i32(|c| c.weekday)))?
        .with_column(Series::new(
            columns::IS_WEEKEND,
            calendar.iter().map(|c| c.is_weekend).collect::<Vec<bool>>(),
        ))?;

    debug!(rows = derived.len(), "derived calendar features");
    Ok(derived)
}

/// Z-score normalise `column` using the mean and sample standard deviation
/// of its non-null values.
///
/// A table without the column is returned unchanged. Statistics come from
/// whatever values the column holds now, so a second pass over z-scores
/// sees mean 0 and standard deviation 1 and returns the same values up to
/// float error; keep the original table if the raw values are needed later.
///
/// Fails with [`ForecastError::DegenerateColumn`] when the column has fewer
/// than two values or no variance.
pub fn normalize(table: &DemandTable, column: &str) -> Result<DemandTable> {
    if !table.has_column(column) {
        debug!(column, "normalize skipped, column absent");
        return Ok(table.clone());
    }

    let values = table.column_f64(column)?;
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.len() < 2 {
        return Err(ForecastError::DegenerateColumn(format!(
            "Column '{}' needs at least two values to normalise, found {}",
            column,
            present.len()
        )));
    }

    let mean = present.iter().mean();
    let std_dev = present.iter().std_dev();
    if !std_dev.is_finite() || std_dev == 0.0 {
        return Err(ForecastError::DegenerateColumn(format!(
            "Column '{}' has zero variance",
            column
        )));
    }

    let scaled: Vec<Option<f64>> = values
        .into_iter()
        .map(|v| v.map(|v| (v - mean) / std_dev))
        .collect();

    debug!(column, mean, std_dev, "normalised column");
    table.with_column(Series::new(column, scaled))
}

/// Dense feature matrix with named columns
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl FeatureMatrix {
    /// Build a matrix from explicit column names and values
    pub fn new(columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if columns.len() != values.ncols() {
            return Err(ForecastError::Schema(format!(
                "{} column names for a matrix with {} columns",
                columns.len(),
                values.ncols()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Select the standard feature vector from a table
    pub fn from_table(table: &DemandTable) -> Result<Self> {
        Self::from_frame(table.dataframe())
    }

    /// Select the standard feature vector from a DataFrame
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let n_rows = df.height();
        let mut values = Array2::<f64>::zeros((n_rows, FEATURE_COLUMNS.len()));

        for (j, name) in FEATURE_COLUMNS.iter().enumerate() {
            require_column(df, name).map_err(|_| {
                ForecastError::Schema(format!(
                    "Feature column '{}' is missing; weather columns come from the input and \
                     calendar columns from derive_calendar_features",
                    name
                ))
            })?;

            for (i, value) in series_to_f64(df.column(name)?)?.into_iter().enumerate() {
                values[[i, j]] = value.ok_or_else(|| {
                    ForecastError::Schema(format!("Feature '{}' is null at row {}", name, i))
                })?;
            }
        }

        Ok(Self {
            columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            values,
        })
    }

    /// Column names in matrix order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Borrow the values
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Number of rows
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    /// Fail unless the columns are exactly `expected`, in order
    pub fn check_schema(&self, expected: &[String]) -> Result<()> {
        if self.columns.as_slice() == expected {
            Ok(())
        } else {
            Err(ForecastError::SchemaMismatch {
                expected: expected.to_vec(),
                actual: self.columns.clone(),
            })
        }
    }
}
