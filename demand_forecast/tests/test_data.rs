use chrono::NaiveDate;
use demand_forecast::data::{DataLoader, MissingValuePolicy, PrepareOptions, RawTable};
use demand_forecast::error::ForecastError;
use demand_forecast::{prepare, prepare_with};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

fn at(day: u32, hour: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

#[test]
fn test_data_loader_from_csv() {
    let file = write_csv(&[
        "Date,Temperature,Humidity,WindSpeed,Demand",
        "2024-01-15 10:00,32.0,45.0,3.0,2500.0",
        "2024-01-15 11:00,33.0,44.0,3.5,2600.0",
        "2024-01-15 12:00,34.0,43.0,2.5,2700.0",
    ]);

    let raw = DataLoader::from_csv(file.path()).unwrap();
    assert_eq!(raw.len(), 3);
    assert!(!raw.is_empty());

    let table = prepare(&raw).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.time_column(), "Date");
    assert_eq!(table.target_column(), Some("Demand"));
    assert_eq!(table.timestamps().unwrap()[0], at(15, 10));
    assert_eq!(table.targets().unwrap(), vec![2500.0, 2600.0, 2700.0]);
}

#[test]
fn test_missing_file_is_artifact_not_found() {
    let result = DataLoader::from_csv("nonexistent_demand_file.csv");
    assert!(matches!(result, Err(ForecastError::ArtifactNotFound(_))));
}

#[test]
fn test_missing_required_columns() {
    let file = write_csv(&["Date,Temperature", "2024-01-15 10:00,32.0"]);
    let raw = DataLoader::from_csv(file.path()).unwrap();
    assert!(matches!(prepare(&raw), Err(ForecastError::Schema(_))));

    let file = write_csv(&["Timestamp,Demand", "2024-01-15 10:00,2500.0"]);
    let raw = DataLoader::from_csv(file.path()).unwrap();
    assert!(matches!(prepare(&raw), Err(ForecastError::Schema(_))));
}

#[test]
fn test_null_demand_row_is_removed() {
    let file = write_csv(&[
        "Date,Temperature,Humidity,WindSpeed,Demand",
        "2024-01-15 10:00,32.0,45.0,3.0,2500.0",
        "2024-01-15 11:00,33.0,44.0,3.5,",
        "2024-01-15 12:00,34.0,43.0,2.5,2700.0",
    ]);

    let table = prepare(&DataLoader::from_csv(file.path()).unwrap()).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.timestamps().unwrap(), vec![at(15, 10), at(15, 12)]);
    assert_eq!(table.targets().unwrap(), vec![2500.0, 2700.0]);
}

#[test]
fn test_unparseable_timestamps_dropped_and_rows_sorted() {
    let file = write_csv(&[
        "Date,Temperature,Humidity,WindSpeed,Demand",
        "2024-01-16 09:00,30.0,40.0,2.0,2300.0",
        "not a timestamp,31.0,41.0,2.0,9999.0",
        "2024-01-15 23:00,29.0,42.0,1.0,2100.0",
        "2024-01-16 01:00,28.0,43.0,1.5,1900.0",
    ]);

    let table = prepare(&DataLoader::from_csv(file.path()).unwrap()).unwrap();

    assert_eq!(
        table.timestamps().unwrap(),
        vec![at(15, 23), at(16, 1), at(16, 9)]
    );
    assert_eq!(table.targets().unwrap(), vec![2100.0, 1900.0, 2300.0]);
    assert_eq!(
        table.required_f64("Temperature").unwrap(),
        vec![29.0, 28.0, 30.0]
    );
}

#[test]
fn test_prepared_table_invariants() {
    let file = write_csv(&[
        "Date,Temperature,Humidity,WindSpeed,Demand",
        "2024-01-17 00:00,30.0,40.0,2.0,2000.0",
        ",31.0,41.0,2.0,2000.0",
        "2024-01-15 05:00,29.0,,1.0,2100.0",
        "2024-01-15 05:00,29.0,42.0,1.0,2150.0",
        "2024-01-16 01:00,28.0,43.0,1.5,",
        "2024-01-14 01:00,28.0,43.0,1.5,1800.0",
    ]);

    let table = prepare(&DataLoader::from_csv(file.path()).unwrap()).unwrap();

    let timestamps = table.timestamps().unwrap();
    assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(table.dataframe().column("Date").unwrap().null_count(), 0);
    assert_eq!(table.dataframe().column("Demand").unwrap().null_count(), 0);
    // drop-on-any-null also removes the row missing humidity
    assert_eq!(table.len(), 3);
}

#[test]
fn test_prepare_does_not_mutate_input() {
    let file = write_csv(&[
        "Date,Demand",
        "2024-01-15 12:00,2700.0",
        "2024-01-15 10:00,2500.0",
    ]);
    let raw = DataLoader::from_csv(file.path()).unwrap();
    let before = raw.dataframe().clone();

    let _ = prepare(&raw).unwrap();

    assert!(raw.dataframe().frame_equal_missing(&before));
}

#[test]
fn test_fill_exogenous_policy() {
    let file = write_csv(&[
        "Date,Temperature,Humidity,WindSpeed,Demand",
        "2024-01-15 10:00,,45.0,3.0,2500.0",
        "2024-01-15 11:00,33.0,,3.5,2600.0",
        "2024-01-15 12:00,34.0,43.0,,2700.0",
        "2024-01-15 13:00,35.0,42.0,2.5,",
    ]);
    let options = PrepareOptions {
        missing_values: MissingValuePolicy::FillExogenous,
        ..PrepareOptions::default()
    };

    let table = prepare_with(&DataLoader::from_csv(file.path()).unwrap(), &options).unwrap();

    assert_eq!(table.len(), 3);
    // leading gap is back-filled, inner gaps forward-filled
    assert_eq!(
        table.required_f64("Temperature").unwrap(),
        vec![33.0, 33.0, 34.0]
    );
    assert_eq!(
        table.required_f64("Humidity").unwrap(),
        vec![45.0, 45.0, 43.0]
    );
    assert_eq!(table.required_f64("WindSpeed").unwrap(), vec![3.0, 3.5, 3.5]);
}

#[test]
fn test_fill_exogenous_fails_on_empty_column() {
    let df = DataFrame::new(vec![
        Series::new("Date", &["2024-01-15 10:00", "2024-01-15 11:00"]),
        Series::new("Humidity", &[None::<f64>, None]),
        Series::new("Demand", &[2500.0, 2600.0]),
    ])
    .unwrap();
    let options = PrepareOptions {
        missing_values: MissingValuePolicy::FillExogenous,
        ..PrepareOptions::default()
    };

    let result = prepare_with(&RawTable::from_dataframe(df), &options);
    assert!(matches!(result, Err(ForecastError::Schema(_))));
}

#[test]
fn test_fill_exogenous_fails_on_empty_csv_column() {
    let file = write_csv(&[
        "Date,Temperature,Humidity,Demand",
        "2024-01-15 10:00,32.0,,2500.0",
        "2024-01-15 11:00,33.0,,2600.0",
    ]);
    let options = PrepareOptions {
        missing_values: MissingValuePolicy::FillExogenous,
        ..PrepareOptions::default()
    };

    let result = prepare_with(&DataLoader::from_csv(file.path()).unwrap(), &options);
    assert!(matches!(result, Err(ForecastError::Schema(_))));
}

#[test]
fn test_fill_exogenous_treats_na_markers_as_gaps() {
    let file = write_csv(&[
        "Date,Temperature,Humidity,Region,Demand",
        "2024-01-15 10:00,NA,45.0,,2500.0",
        "2024-01-15 11:00,33.0,NaN,north,2600.0",
        "2024-01-15 12:00,34.0,43.0,NULL,2700.0",
    ]);
    let options = PrepareOptions {
        missing_values: MissingValuePolicy::FillExogenous,
        ..PrepareOptions::default()
    };

    let table = prepare_with(&DataLoader::from_csv(file.path()).unwrap(), &options).unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(
        table.required_f64("Temperature").unwrap(),
        vec![33.0, 33.0, 34.0]
    );
    assert_eq!(
        table.required_f64("Humidity").unwrap(),
        vec![45.0, 45.0, 43.0]
    );
    let region: Vec<Option<&str>> = table
        .dataframe()
        .column("Region")
        .unwrap()
        .utf8()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(region, vec![Some("north"); 3]);
}

#[test]
fn test_nan_demand_row_is_removed() {
    let mut lines = vec!["Date,Temperature,Demand".to_string()];
    for hour in 0..20 {
        let demand = if hour == 5 {
            "NaN".to_string()
        } else {
            format!("{}.0", 2000 + hour * 10)
        };
        lines.push(format!("2024-01-15 {:02}:00,30.0,{}", hour, demand));
    }
    let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
    let file = write_csv(&lines);

    let table = prepare(&DataLoader::from_csv(file.path()).unwrap()).unwrap();

    assert_eq!(table.len(), 19);
    assert!(table.targets().unwrap().iter().all(|d| d.is_finite()));
    assert!(!table.timestamps().unwrap().contains(&at(15, 5)));
}

#[test]
fn test_nan_values_count_as_missing_in_dataframes() {
    let df = DataFrame::new(vec![
        Series::new("Date", &["2024-01-15 10:00", "2024-01-15 11:00", "2024-01-15 12:00"]),
        Series::new("Temperature", &[30.0, f64::NAN, 32.0]),
        Series::new("Demand", &[2500.0, 2600.0, f64::INFINITY]),
    ])
    .unwrap();

    let table = prepare(&RawTable::from_dataframe(df)).unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(table.timestamps().unwrap(), vec![at(15, 10)]);
}

#[test]
fn test_write_csv_round_trip() {
    let file = write_csv(&[
        "Date,Temperature,Humidity,WindSpeed,Demand",
        "2024-01-15 11:00,33.0,44.0,3.5,2600.0",
        "2024-01-15 10:00,32.0,45.0,3.0,2500.0",
    ]);
    let table = prepare(&DataLoader::from_csv(file.path()).unwrap()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let cleaned = dir.path().join("processed").join("cleaned_data.csv");
    table.write_csv(&cleaned).unwrap();

    let reloaded = DataLoader::load_prepared(&cleaned, &PrepareOptions::default()).unwrap();
    assert_eq!(reloaded.timestamps().unwrap(), table.timestamps().unwrap());
    assert_eq!(reloaded.targets().unwrap(), table.targets().unwrap());
}
