//! Seeded train/test partitioning

use crate::data::{require_column, DemandTable};
use crate::error::{ForecastError, Result};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

/// Train and test partitions of a table
///
/// Feature frames hold every column except the target. Row `i` of
/// `x_train` lines up with `y_train[i]` and with `train_rows[i]`, the row's
/// position in the source table; the same holds for the test side.
#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: DataFrame,
    pub x_test: DataFrame,
    pub y_train: Vec<f64>,
    pub y_test: Vec<f64>,
    pub train_rows: Vec<usize>,
    pub test_rows: Vec<usize>,
}

impl Split {
    /// Consume the split as `(x_train, x_test, y_train, y_test)`
    pub fn into_parts(self) -> (DataFrame, DataFrame, Vec<f64>, Vec<f64>) {
        (self.x_train, self.x_test, self.y_train, self.y_test)
    }
}

/// Partition `table` into train and test sets.
///
/// Row indices are shuffled with a generator seeded by `seed`; the first
/// `ceil(n * test_fraction)` shuffled rows form the test set and the rest
/// the train set. The same seed always yields the same partition.
pub fn split(
    table: &DemandTable,
    target_column: &str,
    test_fraction: f64,
    seed: u64,
) -> Result<Split> {
    let df = table.dataframe();
    require_column(df, target_column)?;

    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ForecastError::InvalidArgument(format!(
            "Test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n = table.len();
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(ForecastError::InvalidArgument(format!(
            "A test fraction of {} leaves an empty partition for {} rows",
            test_fraction, n
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let (test_rows, train_rows) = order.split_at(n_test);

    let targets = table.required_f64(target_column)?;
    let features = df.drop(target_column)?;

    let take = |rows: &[usize]| -> Result<DataFrame> {
        let idx = IdxCa::from_vec("idx", rows.iter().map(|&r| r as IdxSize).collect());
        Ok(features.take(&idx)?)
    };
    let pick = |rows: &[usize]| -> Vec<f64> { rows.iter().map(|&r| targets[r]).collect() };

    let split = Split {
        x_train: take(train_rows)?,
        x_test: take(test_rows)?,
        y_train: pick(train_rows),
        y_test: pick(test_rows),
        train_rows: train_rows.to_vec(),
        test_rows: test_rows.to_vec(),
    };

    info!(
        train = split.train_rows.len(),
        test = split.test_rows.len(),
        seed,
        "split dataset"
    );
    Ok(split)
}
