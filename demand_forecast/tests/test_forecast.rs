use chrono::{Duration, NaiveDate, NaiveDateTime};
use demand_forecast::data::{DataLoader, DemandTable};
use demand_forecast::error::ForecastError;
use demand_forecast::features::{derive_calendar_features, FeatureMatrix};
use demand_forecast::forecast::{
    build_future_table, forecast_demand, predict_history, predict_point, write_forecast_csv,
    DemandSummary, PlaceholderWeather, PointQuery, MAX_FORECAST_DAYS,
};
use demand_forecast::models::{train_model, ModelHandle, ModelKind, TrainedDemandModel};
use demand_forecast::prepare;
use demand_math::BoostingParams;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

fn monday_ten_thirty() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(10, 30, 45)
        .unwrap()
}

fn history() -> DemandTable {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,Temperature,Humidity,WindSpeed,Demand").unwrap();
    for h in 0..(7 * 24) {
        let hour = h % 24;
        let temperature = 20.0 + (hour % 12) as f64;
        let demand = if h == 100 {
            4000.0
        } else {
            2000.0 + 20.0 * temperature + hour as f64
        };
        writeln!(
            file,
            "{},{:.1},{:.1},{:.1},{:.1}",
            (start + Duration::hours(h)).format("%Y-%m-%d %H:%M"),
            temperature,
            45.0 + (h % 4) as f64,
            2.0 + (h % 3) as f64,
            demand
        )
        .unwrap();
    }
    file.flush().unwrap();
    prepare(&DataLoader::from_csv(file.path()).unwrap()).unwrap()
}

fn trained(kind: ModelKind) -> ModelHandle {
    let table = derive_calendar_features(&history()).unwrap();
    let features = FeatureMatrix::from_table(&table).unwrap();
    let params = BoostingParams {
        n_estimators: 20,
        ..BoostingParams::default()
    };
    train_model(kind, &features, &table.targets().unwrap(), &params).unwrap()
}

#[test]
fn test_future_table_has_72_hourly_rows() {
    let table = build_future_table(3, monday_ten_thirty(), &PlaceholderWeather::default()).unwrap();

    assert_eq!(table.len(), 72);
    let timestamps = table.timestamps().unwrap();
    let start = NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    assert_eq!(timestamps[0], start);
    for pair in timestamps.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::hours(1));
    }
    assert_eq!(timestamps[71], start + Duration::hours(71));
}

#[test]
fn test_future_table_uses_placeholder_weather_and_calendar() {
    let weather = PlaceholderWeather::default();
    let table = build_future_table(1, monday_ten_thirty(), &weather).unwrap();

    assert_eq!(table.target_column(), None);
    assert_eq!(table.required_f64("Temperature").unwrap(), vec![30.0; 24]);
    assert_eq!(table.required_f64("Humidity").unwrap(), vec![40.0; 24]);
    assert_eq!(table.required_f64("WindSpeed").unwrap(), vec![2.0; 24]);

    let hours = table.required_f64("Hour").unwrap();
    assert_eq!(hours[0], 10.0);
    assert_eq!(hours[14], 0.0);
    let weekdays = table.required_f64("Weekday").unwrap();
    assert_eq!(weekdays[0], 0.0);
    assert_eq!(weekdays[14], 1.0);

    // ready for the feature matrix without further work
    assert_eq!(FeatureMatrix::from_table(&table).unwrap().nrows(), 24);
}

#[test]
fn test_future_table_rejects_horizons_past_the_calendar() {
    let weather = PlaceholderWeather::default();
    let near_end = NaiveDateTime::MAX - Duration::hours(30);

    let result = build_future_table(2, near_end, &weather);
    assert!(matches!(result, Err(ForecastError::InvalidArgument(_))));

    let result = build_future_table(usize::MAX, monday_ten_thirty(), &weather);
    assert!(matches!(result, Err(ForecastError::InvalidArgument(_))));

    // one day still fits before the end of the calendar
    assert_eq!(build_future_table(1, near_end, &weather).unwrap().len(), 24);
}

#[test]
fn test_future_table_rejects_zero_days() {
    let result = build_future_table(0, monday_ten_thirty(), &PlaceholderWeather::default());
    assert!(matches!(result, Err(ForecastError::InvalidArgument(_))));
}

#[rstest]
#[case(ModelKind::Linear)]
#[case(ModelKind::GradientBoosted)]
fn test_forecast_demand(#[case] kind: ModelKind) {
    let model = trained(kind);

    let forecast =
        forecast_demand(&model, 2, monday_ten_thirty(), &PlaceholderWeather::default()).unwrap();

    assert_eq!(forecast.len(), 48);
    let demand = forecast.required_f64("Forecast Demand").unwrap();
    assert!(demand.iter().all(|d| d.is_finite()));

    // the same rows predicted directly give the same numbers
    let future = build_future_table(2, monday_ten_thirty(), &PlaceholderWeather::default()).unwrap();
    let direct = model.predict(&FeatureMatrix::from_table(&future).unwrap()).unwrap();
    assert_eq!(demand, direct);
}

#[rstest]
#[case(0)]
#[case(MAX_FORECAST_DAYS + 1)]
fn test_forecast_horizon_limits(#[case] days: usize) {
    let model = trained(ModelKind::Linear);
    let result = forecast_demand(&model, days, monday_ten_thirty(), &PlaceholderWeather::default());
    assert!(matches!(result, Err(ForecastError::InvalidArgument(_))));
}

#[test]
fn test_forecast_through_trait_object() {
    let model = trained(ModelKind::Linear);
    let dynamic: &dyn TrainedDemandModel = &model;

    let forecast = forecast_demand(dynamic, MAX_FORECAST_DAYS, monday_ten_thirty(), &PlaceholderWeather::default())
        .unwrap();

    assert_eq!(forecast.len(), MAX_FORECAST_DAYS * 24);
}

#[test]
fn test_point_prediction_matches_history_features() {
    let model = trained(ModelKind::Linear);
    let query = PointQuery {
        date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        hour: 10,
        temperature: 32.0,
        humidity: 45.0,
        wind_speed: 3.0,
    };

    let point = predict_point(&model, &query).unwrap();

    // the same observation routed through the history path
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,Temperature,Humidity,WindSpeed,Demand").unwrap();
    writeln!(file, "2024-01-15 10:00,32.0,45.0,3.0,2500.0").unwrap();
    file.flush().unwrap();
    let table = prepare(&DataLoader::from_csv(file.path()).unwrap()).unwrap();
    let history = predict_history(&model, &table).unwrap();

    assert_eq!(history.required_f64("Predicted Demand").unwrap(), vec![point]);
}

#[rstest]
#[case(24, 30.0, 40.0, 2.0)]
#[case(10, f64::NAN, 40.0, 2.0)]
#[case(10, 30.0, 101.0, 2.0)]
#[case(10, 30.0, -1.0, 2.0)]
#[case(10, 30.0, 40.0, -0.5)]
#[case(10, 30.0, 40.0, f64::INFINITY)]
fn test_point_query_validation(
    #[case] hour: u32,
    #[case] temperature: f64,
    #[case] humidity: f64,
    #[case] wind_speed: f64,
) {
    let model = trained(ModelKind::Linear);
    let query = PointQuery {
        date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        hour,
        temperature,
        humidity,
        wind_speed,
    };
    assert!(matches!(
        predict_point(&model, &query),
        Err(ForecastError::InvalidArgument(_))
    ));
}

#[test]
fn test_predict_history_adds_column() {
    let model = trained(ModelKind::GradientBoosted);
    let table = history();

    let predicted = predict_history(&model, &table).unwrap();

    assert_eq!(predicted.len(), table.len());
    assert!(predicted.has_column("Predicted Demand"));
    assert!(predicted.has_column("Hour"));
    assert!(!table.has_column("Predicted Demand"));
}

#[test]
fn test_demand_summary() {
    let table = history();

    let summary = DemandSummary::from_table(&table).unwrap();

    assert_eq!(summary.observations, 168);
    assert_eq!(summary.peak, 4000.0);
    assert_eq!(
        summary.peak_time,
        NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(4, 0, 0)
            .unwrap()
    );
    // hour 0 on any day: 2000 + 20 * 20
    assert_eq!(summary.minimum, 2400.0);
    assert!(summary.mean > summary.minimum && summary.mean < summary.peak);
}

#[test]
fn test_summary_needs_a_target() {
    let future = build_future_table(1, monday_ten_thirty(), &PlaceholderWeather::default()).unwrap();
    assert!(matches!(
        DemandSummary::from_table(&future),
        Err(ForecastError::Schema(_))
    ));
}

#[test]
fn test_write_forecast_csv() {
    let model = trained(ModelKind::Linear);
    let forecast =
        forecast_demand(&model, 1, monday_ten_thirty(), &PlaceholderWeather::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forecast.csv");
    write_forecast_csv(&forecast, &path).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["Date", "Forecast Demand"]);

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 24);
    assert_eq!(&rows[0][0], "2024-01-15 10:00:00");
}
