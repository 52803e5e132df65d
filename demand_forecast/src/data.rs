//! Loading and cleaning of demand observations

use crate::columns;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Formats tried, in order, when a timestamp arrives as text
const DATETIME_FORMATS: [&str; 9] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

/// Date-only formats; the time defaults to midnight
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];

/// Cell values read as missing, matching the markers common CSV exports use
const NULL_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Unprocessed table exactly as read from the source file
#[derive(Debug, Clone)]
pub struct RawTable {
    df: DataFrame,
}

/// Cleaned, chronologically ordered demand table
///
/// The time column holds millisecond datetimes with no nulls and never
/// decreases from one row to the next. When the table carries a target
/// column it holds no nulls either. Transforms return new tables and leave
/// the receiver untouched.
#[derive(Debug, Clone)]
pub struct DemandTable {
    df: DataFrame,
    time_column: String,
    target_column: Option<String>,
}

/// How rows with missing values are treated by [`prepare_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingValuePolicy {
    /// Drop every row that has a null in any column
    #[default]
    DropAnyNull,
    /// Drop rows missing the timestamp or target, then forward-fill and
    /// back-fill every other column in time order
    FillExogenous,
}

/// Options for [`prepare_with`]
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareOptions {
    /// Name of the timestamp column
    pub time_column: String,
    /// Name of the target column
    pub target_column: String,
    /// Missing-value policy
    pub missing_values: MissingValuePolicy,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            time_column: columns::DATE.to_string(),
            target_column: columns::DEMAND.to_string(),
            missing_values: MissingValuePolicy::default(),
        }
    }
}

/// Data loader for demand tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a raw table from a CSV file.
    ///
    /// Empty cells and the usual missing-value markers (`NA`, `NaN`, `null`
    /// and similar) are read as nulls.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<RawTable> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForecastError::ArtifactNotFound(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .with_null_values(Some(NullValues::AllColumns(
                NULL_MARKERS.iter().map(|m| m.to_string()).collect(),
            )))
            .finish()?;

        info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            "loaded raw table"
        );

        Ok(RawTable { df })
    }

    /// Load a CSV file and prepare it in one step
    pub fn load_prepared<P: AsRef<Path>>(path: P, options: &PrepareOptions) -> Result<DemandTable> {
        let raw = Self::from_csv(path)?;
        prepare_with(&raw, options)
    }
}

impl RawTable {
    /// Wrap an existing DataFrame
    pub fn from_dataframe(df: DataFrame) -> Self {
        Self { df }
    }

    /// Get the DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }
}

/// Prepare a raw table with the default `Date` / `Demand` columns and the
/// drop-on-any-null policy.
pub fn prepare(raw: &RawTable) -> Result<DemandTable> {
    prepare_with(raw, &PrepareOptions::default())
}

/// Clean a raw table into a [`DemandTable`].
///
/// Rows are dropped according to the missing-value policy and whenever the
/// timestamp is missing or cannot be parsed, or the target is missing, not
/// numeric or not finite. NaN in a float column counts as missing. Survivors are sorted by timestamp (stable for equal timestamps)
/// and renumbered from zero.
pub fn prepare_with(raw: &RawTable, options: &PrepareOptions) -> Result<DemandTable> {
    let df = raw.dataframe();
    require_column(df, &options.time_column)?;
    require_column(df, &options.target_column)?;

    let timestamps = parse_time_series(df.column(&options.time_column)?)?;
    let targets = series_to_f64(df.column(&options.target_column)?)?;
    let null_rows = match options.missing_values {
        MissingValuePolicy::DropAnyNull => rows_with_nulls(df)?,
        MissingValuePolicy::FillExogenous => vec![false; df.height()],
    };

    let mut keep: Vec<usize> = (0..df.height())
        .filter(|&i| {
            timestamps[i].is_some() && targets[i].map_or(false, f64::is_finite) && !null_rows[i]
        })
        .collect();
    keep.sort_by_key(|&i| timestamps[i]);

    let idx = IdxCa::from_vec("idx", keep.iter().map(|&i| i as IdxSize).collect());
    let mut prepared = df.take(&idx)?;

    let millis: Vec<i64> = keep
        .iter()
        .filter_map(|&i| timestamps[i])
        .map(to_epoch_millis)
        .collect();
    prepared.with_column(datetime_series(&options.time_column, millis)?)?;

    let demand: Vec<f64> = keep.iter().filter_map(|&i| targets[i]).collect();
    prepared.with_column(Series::new(&options.target_column, demand))?;

    if options.missing_values == MissingValuePolicy::FillExogenous {
        fill_exogenous(&mut prepared, options)?;
    }

    info!(
        kept = prepared.height(),
        dropped = df.height() - prepared.height(),
        policy = ?options.missing_values,
        "prepared demand table"
    );

    Ok(DemandTable {
        df: prepared,
        time_column: options.time_column.clone(),
        target_column: Some(options.target_column.clone()),
    })
}

impl DemandTable {
    /// Build a table from parts that already satisfy the table invariants
    pub(crate) fn from_parts(
        df: DataFrame,
        time_column: impl Into<String>,
        target_column: Option<String>,
    ) -> Self {
        Self {
            df,
            time_column: time_column.into(),
            target_column,
        }
    }

    /// Get the DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Get the time column name
    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    /// Get the target column name, if the table has one
    pub fn target_column(&self) -> Option<&str> {
        self.target_column.as_deref()
    }

    /// Get the length of the table
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Column names in table order
    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Check whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.df.get_column_names().contains(&name)
    }

    /// Timestamps of every row
    pub fn timestamps(&self) -> Result<Vec<NaiveDateTime>> {
        let series = self.df.column(&self.time_column)?;
        parse_time_series(series)?
            .into_iter()
            .enumerate()
            .map(|(row, ts)| {
                ts.ok_or_else(|| {
                    ForecastError::Schema(format!(
                        "Row {} of '{}' has no timestamp",
                        row, self.time_column
                    ))
                })
            })
            .collect()
    }

    /// A numeric column as f64 values; nulls stay `None`
    pub fn column_f64(&self, name: &str) -> Result<Vec<Option<f64>>> {
        require_column(&self.df, name)?;
        series_to_f64(self.df.column(name)?)
    }

    /// A numeric column that must not contain nulls
    pub fn required_f64(&self, name: &str) -> Result<Vec<f64>> {
        self.column_f64(name)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| {
                    ForecastError::Schema(format!("Column '{}' is null at row {}", name, row))
                })
            })
            .collect()
    }

    /// Target values, for tables that carry a target column
    pub fn targets(&self) -> Result<Vec<f64>> {
        let target = self
            .target_column
            .as_deref()
            .ok_or_else(|| ForecastError::Schema("Table has no target column".to_string()))?;
        self.required_f64(target)
    }

    /// Return a copy with `series` added, or replacing the column of the same name
    pub fn with_column(&self, series: Series) -> Result<Self> {
        if series.len() != self.len() {
            return Err(ForecastError::Schema(format!(
                "Column '{}' has {} values but the table has {} rows",
                series.name(),
                series.len(),
                self.len()
            )));
        }
        if series.name() == self.time_column {
            return Err(ForecastError::Schema(format!(
                "The time column '{}' cannot be replaced",
                self.time_column
            )));
        }

        let mut df = self.df.clone();
        df.with_column(series)?;
        Ok(Self {
            df,
            time_column: self.time_column.clone(),
            target_column: self.target_column.clone(),
        })
    }

    /// Write the table as CSV, creating parent directories as needed
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(path)?;
        let mut df = self.df.clone();
        CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;

        info!(path = %path.display(), rows = df.height(), "wrote table");
        Ok(())
    }
}

/// Parse a single timestamp string.
///
/// Accepts ISO-like date-times (space or `T` separated, optional seconds and
/// fractional seconds), RFC 3339 with an offset (converted to its local wall
/// clock), day-first variants, and bare dates at midnight.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let text = raw.trim();

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.naive_local());
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            if let Some(ts) = date.and_hms_opt(0, 0, 0) {
                return Ok(ts);
            }
        }
    }

    Err(ForecastError::Parse(format!(
        "Unrecognised timestamp '{}'",
        raw
    )))
}

pub(crate) fn require_column(df: &DataFrame, name: &str) -> Result<()> {
    if df.get_column_names().contains(&name) {
        Ok(())
    } else {
        Err(ForecastError::Schema(format!(
            "Required column '{}' not found (available: {:?})",
            name,
            df.get_column_names()
        )))
    }
}

/// Milliseconds since the Unix epoch for a naive (wall clock) timestamp
pub(crate) fn to_epoch_millis(ts: NaiveDateTime) -> i64 {
    Utc.from_utc_datetime(&ts).timestamp_millis()
}

pub(crate) fn datetime_series(name: &str, millis: Vec<i64>) -> Result<Series> {
    Ok(Series::new(name, millis).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?)
}

/// Helper to get any numeric (or numeric-looking text) column as f64 values
pub(crate) fn series_to_f64(series: &Series) -> Result<Vec<Option<f64>>> {
    let casted = series.cast(&DataType::Float64).map_err(|e| {
        ForecastError::Schema(format!(
            "Column '{}' cannot be converted to f64: {}",
            series.name(),
            e
        ))
    })?;
    let values = casted.f64()?;
    Ok(values.into_iter().collect())
}

fn from_epoch(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let (secs, nanos) = match unit {
        TimeUnit::Nanoseconds => (
            value.div_euclid(1_000_000_000),
            value.rem_euclid(1_000_000_000),
        ),
        TimeUnit::Microseconds => (
            value.div_euclid(1_000_000),
            value.rem_euclid(1_000_000) * 1_000,
        ),
        TimeUnit::Milliseconds => (value.div_euclid(1_000), value.rem_euclid(1_000) * 1_000_000),
    };
    DateTime::from_timestamp(secs, nanos as u32).map(|d| d.naive_utc())
}

/// Read a time column of any supported dtype; unparseable values become `None`
fn parse_time_series(series: &Series) -> Result<Vec<Option<NaiveDateTime>>> {
    match series.dtype() {
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let physical = series.cast(&DataType::Int64)?;
            let values = physical.i64()?;
            Ok(values
                .into_iter()
                .map(|v| v.and_then(|v| from_epoch(v, unit)))
                .collect())
        }
        DataType::Date => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
                .ok_or_else(|| ForecastError::Parse("Invalid epoch date".to_string()))?;
            let physical = series.cast(&DataType::Int32)?;
            let values = physical.i32()?;
            Ok(values
                .into_iter()
                .map(|v| {
                    v.and_then(|days| epoch.checked_add_signed(chrono::Duration::days(days as i64)))
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                })
                .collect())
        }
        _ => {
            let text = series.cast(&DataType::Utf8)?;
            let values = text.utf8()?;
            let mut failures = 0usize;
            let parsed = values
                .into_iter()
                .map(|v| {
                    v.and_then(|raw| match parse_timestamp(raw) {
                        Ok(ts) => Some(ts),
                        Err(err) => {
                            failures += 1;
                            debug!(%err, "timestamp parse failure");
                            None
                        }
                    })
                })
                .collect();
            if failures > 0 {
                warn!(
                    column = series.name(),
                    failures, "rows with unparseable timestamps will be dropped"
                );
            }
            Ok(parsed)
        }
    }
}

fn is_float(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// A float column's values with NaN folded into `None`
fn float_values(series: &Series) -> Result<Vec<Option<f64>>> {
    Ok(series_to_f64(series)?
        .into_iter()
        .map(|v| v.filter(|v| !v.is_nan()))
        .collect())
}

fn rows_with_nulls(df: &DataFrame) -> Result<Vec<bool>> {
    let mut flags = vec![false; df.height()];
    for series in df.get_columns() {
        let mask = series.is_null();
        for (flag, is_null) in flags.iter_mut().zip(mask.into_iter()) {
            if is_null.unwrap_or(false) {
                *flag = true;
            }
        }
        if is_float(series.dtype()) {
            for (flag, value) in flags.iter_mut().zip(float_values(series)?) {
                if value.is_none() {
                    *flag = true;
                }
            }
        }
    }
    Ok(flags)
}

/// Text that holds numbers (or nothing at all) is filled as numbers;
/// any other text column is filled with its own strings.
fn fill_exogenous(df: &mut DataFrame, options: &PrepareOptions) -> Result<()> {
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .filter(|name| *name != options.time_column && *name != options.target_column)
        .map(str::to_string)
        .collect();

    for name in names {
        let series = df.column(&name)?.clone();
        let filled = if series.dtype() == &DataType::Utf8 && !holds_numbers(&series)? {
            let values: Vec<Option<String>> = series
                .utf8()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect();
            fill_column(&name, &values)?.map(|filled| Series::new(&name, filled))
        } else {
            let values = float_values(&series)?;
            let retyped = series.dtype() == &DataType::Utf8;
            match fill_column(&name, &values)? {
                Some(filled) => Some(Series::new(&name, filled)),
                None if retyped => Some(Series::new(&name, values)),
                None => None,
            }
        };

        if let Some(filled) = filled {
            df.with_column(filled)?;
        }
    }
    Ok(())
}

/// True when every non-null text value parses as a number
fn holds_numbers(series: &Series) -> Result<bool> {
    let numeric = series_to_f64(series)?;
    Ok(numeric.iter().filter(|v| v.is_none()).count() == series.null_count())
}

/// The filled column, `None` when nothing was missing
fn fill_column<T: Clone>(name: &str, values: &[Option<T>]) -> Result<Option<Vec<T>>> {
    let missing = values.iter().filter(|v| v.is_none()).count();
    if missing == 0 {
        return Ok(None);
    }

    let filled = forward_back_fill(values).ok_or_else(|| {
        ForecastError::Schema(format!(
            "Column '{}' has no values to fill {} gaps from",
            name, missing
        ))
    })?;
    debug!(column = name, missing, "filled exogenous gaps");
    Ok(Some(filled))
}

/// Forward fill, then back fill whatever leading gap remains.
/// `None` when the input holds no value at all.
fn forward_back_fill<T: Clone>(values: &[Option<T>]) -> Option<Vec<T>> {
    let mut last = values.iter().flatten().next()?.clone();
    Some(
        values
            .iter()
            .map(|v| {
                if let Some(v) = v {
                    last = v.clone();
                }
                last.clone()
            })
            .collect(),
    )
}
