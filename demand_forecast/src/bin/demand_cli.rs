//! Demand forecasting CLI
//!
//! Batch entry point for cleaning data, training both models, forecasting
//! and single-point predictions.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use demand_forecast::data::parse_timestamp;
use demand_forecast::features::{derive_calendar_features, FeatureMatrix};
use demand_forecast::forecast::write_forecast_csv;
use demand_forecast::{
    forecast_demand, predict_point, split, DataLoader, DemandSummary, ForecastConfig,
    ForecastError, ModelHandle, ModelKind, PointQuery, RegressionMetrics, TrainedDemandModel,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "demand_cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Electricity demand forecasting", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a raw CSV file into a prepared table
    Preprocess {
        /// Raw input CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Cleaned output CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Fill gaps in weather columns instead of dropping incomplete rows
        #[arg(long)]
        fill: bool,
    },

    /// Train both models, report their accuracy and write the artifacts
    Train {
        /// Cleaned data CSV
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Directory for the model artifacts
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Fraction of rows held out for evaluation
        #[arg(long)]
        test_fraction: Option<f64>,

        /// Seed for the train/test shuffle
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Forecast hourly demand for the coming days
    Forecast {
        /// Model name ("Linear Regression" or "XGBoost")
        #[arg(short, long, default_value = "XGBoost")]
        model: String,

        /// Horizon in days (1-7)
        #[arg(short, long, default_value = "3")]
        days: usize,

        /// First forecast hour; defaults to now
        #[arg(long)]
        start: Option<String>,

        /// Write the forecast to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Predict demand for a single date and hour
    Predict {
        /// Model name ("Linear Regression" or "XGBoost")
        #[arg(short, long, default_value = "XGBoost")]
        model: String,

        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: String,

        #[arg(long)]
        hour: u32,

        /// Temperature in °C
        #[arg(long)]
        temperature: f64,

        /// Relative humidity in percent
        #[arg(long)]
        humidity: f64,

        /// Wind speed in m/s
        #[arg(long)]
        wind_speed: f64,
    },

    /// Show peak, minimum and mean demand
    Summary {
        /// Cleaned data CSV
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demand_forecast=info,demand_cli=info".into()),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let missing = err.chain().find_map(|e| match e.downcast_ref::<ForecastError>() {
                Some(ForecastError::ArtifactNotFound(path)) => Some(path.clone()),
                _ => None,
            });
            match missing {
                Some(path) => {
                    eprintln!("Required file not found: {}", path.display());
                    eprintln!("Run `demand_cli preprocess` and `demand_cli train` first, or pass the correct path.");
                }
                None => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ForecastConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ForecastConfig::default(),
    };

    match cli.command {
        Commands::Preprocess { input, output, fill } => cmd_preprocess(&config, &input, &output, fill),
        Commands::Train {
            data,
            models_dir,
            test_fraction,
            seed,
        } => {
            let mut config = config;
            if let Some(data) = data {
                config.data_path = data;
            }
            if let Some(dir) = models_dir {
                config.models_dir = dir;
            }
            if let Some(fraction) = test_fraction {
                config.test_fraction = fraction;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            cmd_train(&config)
        }
        Commands::Forecast {
            model,
            days,
            start,
            output,
        } => cmd_forecast(&config, &model, days, start.as_deref(), output.as_deref()),
        Commands::Predict {
            model,
            date,
            hour,
            temperature,
            humidity,
            wind_speed,
        } => {
            let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", date))?;
            let query = PointQuery {
                date,
                hour,
                temperature,
                humidity,
                wind_speed,
            };
            cmd_predict(&config, &model, &query)
        }
        Commands::Summary { data } => {
            let path = data.unwrap_or_else(|| config.data_path.clone());
            cmd_summary(&config, &path)
        }
    }
}

fn cmd_preprocess(config: &ForecastConfig, input: &Path, output: &Path, fill: bool) -> anyhow::Result<()> {
    let mut options = config.prepare_options();
    if fill {
        options.missing_values = demand_forecast::MissingValuePolicy::FillExogenous;
    }

    let raw = DataLoader::from_csv(input)?;
    let table = demand_forecast::prepare_with(&raw, &options)?;
    table.write_csv(output)?;

    println!(
        "Kept {} of {} rows, written to {}",
        table.len(),
        raw.len(),
        output.display()
    );
    Ok(())
}

fn cmd_train(config: &ForecastConfig) -> anyhow::Result<()> {
    let table = DataLoader::load_prepared(&config.data_path, &config.prepare_options())?;
    let table = derive_calendar_features(&table)?;
    let parts = split(&table, &config.target_column, config.test_fraction, config.seed)?;

    let x_train = FeatureMatrix::from_frame(&parts.x_train)?;
    let x_test = FeatureMatrix::from_frame(&parts.x_test)?;

    println!(
        "Training on {} rows, evaluating on {} rows",
        parts.y_train.len(),
        parts.y_test.len()
    );

    for kind in ModelKind::ALL {
        let model = demand_forecast::models::train_model(kind, &x_train, &parts.y_train, &config.boosting)?;
        let predictions = model.predict(&x_test)?;
        let metrics = RegressionMetrics::compute(&parts.y_test, &predictions)?;
        info!(model = %kind, rmse = metrics.rmse, "evaluated model");
        println!("{:<18} {}", kind.name(), metrics);

        let path = config.model_path(kind);
        model.persist(&path)?;
        println!("{:<18} saved to {}", "", path.display());
    }
    Ok(())
}

fn load_model(config: &ForecastConfig, name: &str) -> anyhow::Result<ModelHandle> {
    let kind: ModelKind = name.parse()?;
    let path = config.model_path(kind);
    Ok(ModelHandle::restore(&path)?)
}

fn cmd_forecast(
    config: &ForecastConfig,
    model: &str,
    days: usize,
    start: Option<&str>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let model = load_model(config, model)?;
    let start = match start {
        Some(text) => parse_timestamp(text)?,
        None => chrono::Local::now().naive_local(),
    };

    let forecast = forecast_demand(&model, days, start, &config.weather)?;
    println!(
        "Note: future hours assume constant weather ({} °C, {} %, {} m/s)",
        config.weather.temperature, config.weather.humidity, config.weather.wind_speed
    );

    match output {
        Some(path) => {
            write_forecast_csv(&forecast, path)?;
            println!("{} hourly values written to {}", forecast.len(), path.display());
        }
        None => {
            let demand = forecast.required_f64(demand_forecast::columns::FORECAST_DEMAND)?;
            for (ts, value) in forecast.timestamps()?.iter().zip(demand) {
                println!("{}  {:>10.2}", ts.format("%Y-%m-%d %H:%M"), value);
            }
        }
    }
    Ok(())
}

fn cmd_predict(config: &ForecastConfig, model: &str, query: &PointQuery) -> anyhow::Result<()> {
    let model = load_model(config, model)?;
    let demand = predict_point(&model, query)?;
    println!(
        "Predicted demand on {} at {:02}:00 ({}): {:.2}",
        query.date,
        query.hour,
        model.name(),
        demand
    );
    Ok(())
}

fn cmd_summary(config: &ForecastConfig, path: &Path) -> anyhow::Result<()> {
    let table = DataLoader::load_prepared(path, &config.prepare_options())?;
    let summary = DemandSummary::from_table(&table)?;

    println!("Observations: {}", summary.observations);
    println!("Peak demand:  {:.2} at {}", summary.peak, summary.peak_time);
    println!("Min demand:   {:.2}", summary.minimum);
    println!("Mean demand:  {:.2}", summary.mean);
    Ok(())
}
