use chrono::{Duration, NaiveDate};
use demand_forecast::data::{DataLoader, DemandTable};
use demand_forecast::error::ForecastError;
use demand_forecast::features::derive_calendar_features;
use demand_forecast::{prepare, split};
use pretty_assertions::assert_eq;
use rstest::rstest;
use polars::prelude::TakeRandom;
use std::collections::HashSet;
use std::io::Write;
use tempfile::NamedTempFile;

fn hourly_table(hours: i64) -> DemandTable {
    let start = NaiveDate::from_ymd_opt(2024, 5, 6)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,Temperature,Humidity,WindSpeed,Demand").unwrap();
    for h in 0..hours {
        writeln!(
            file,
            "{},{},{},{},{}",
            (start + Duration::hours(h)).format("%Y-%m-%d %H:%M"),
            25.0 + (h % 10) as f64,
            40.0 + (h % 5) as f64,
            1.0 + (h % 4) as f64,
            // unique demand per row, so targets identify their rows
            1000.0 + h as f64
        )
        .unwrap();
    }
    file.flush().unwrap();
    let table = prepare(&DataLoader::from_csv(file.path()).unwrap()).unwrap();
    derive_calendar_features(&table).unwrap()
}

#[test]
fn test_split_sizes_and_disjointness() {
    let table = hourly_table(100);

    let parts = split(&table, "Demand", 0.2, 42).unwrap();

    assert_eq!(parts.test_rows.len(), 20);
    assert_eq!(parts.train_rows.len(), 80);
    assert_eq!(parts.x_train.height(), 80);
    assert_eq!(parts.x_test.height(), 20);
    assert_eq!(parts.y_train.len(), 80);
    assert_eq!(parts.y_test.len(), 20);

    let train: HashSet<usize> = parts.train_rows.iter().copied().collect();
    let test: HashSet<usize> = parts.test_rows.iter().copied().collect();
    assert!(train.is_disjoint(&test));
    assert_eq!(train.union(&test).count(), 100);
}

#[test]
fn test_split_keeps_rows_aligned() {
    let table = hourly_table(50);
    let targets = table.targets().unwrap();

    let parts = split(&table, "Demand", 0.3, 7).unwrap();

    for (i, &row) in parts.test_rows.iter().enumerate() {
        assert_eq!(parts.y_test[i], targets[row]);
    }
    for (i, &row) in parts.train_rows.iter().enumerate() {
        assert_eq!(parts.y_train[i], targets[row]);
    }

    // feature rows follow the same order as their targets
    let hours = parts.x_train.column("Hour").unwrap().cast(&polars::prelude::DataType::Float64).unwrap();
    let hours = hours.f64().unwrap();
    for (i, &row) in parts.train_rows.iter().enumerate() {
        assert_eq!(hours.get(i), Some((row % 24) as f64));
    }
}

#[test]
fn test_split_drops_target_from_features() {
    let table = hourly_table(20);
    let (x_train, x_test, _, _) = split(&table, "Demand", 0.25, 1).unwrap().into_parts();

    for frame in [&x_train, &x_test] {
        let names = frame.get_column_names();
        assert!(!names.contains(&"Demand"));
        assert!(names.contains(&"Temperature"));
        assert!(names.contains(&"Hour"));
    }
}

#[test]
fn test_split_is_deterministic_for_a_seed() {
    let table = hourly_table(60);

    let a = split(&table, "Demand", 0.2, 42).unwrap();
    let b = split(&table, "Demand", 0.2, 42).unwrap();
    let c = split(&table, "Demand", 0.2, 43).unwrap();

    assert_eq!(a.test_rows, b.test_rows);
    assert_eq!(a.y_train, b.y_train);
    assert!(a.x_test.frame_equal_missing(&b.x_test));
    assert_ne!(a.test_rows, c.test_rows);
}

#[test]
fn test_split_missing_target_is_schema_error() {
    let table = hourly_table(10);
    let result = split(&table, "Load", 0.2, 42);
    assert!(matches!(result, Err(ForecastError::Schema(_))));
}

#[rstest]
#[case(0.0)]
#[case(1.0)]
#[case(-0.1)]
#[case(1.5)]
#[case(f64::NAN)]
fn test_split_rejects_bad_fractions(#[case] fraction: f64) {
    let table = hourly_table(10);
    let result = split(&table, "Demand", fraction, 42);
    assert!(matches!(result, Err(ForecastError::InvalidArgument(_))));
}

#[test]
fn test_split_rejects_empty_partitions() {
    let single = hourly_table(1);
    assert!(matches!(
        split(&single, "Demand", 0.5, 42),
        Err(ForecastError::InvalidArgument(_))
    ));

    // ceil(3 * 0.9) = 3 leaves nothing to train on
    let small = hourly_table(3);
    assert!(matches!(
        split(&small, "Demand", 0.9, 42),
        Err(ForecastError::InvalidArgument(_))
    ));
}
