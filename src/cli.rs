//! CLI definition and stage dispatch.
//!
//! Each subcommand runs one pipeline stage end to end: a stage fully
//! consumes its input and writes its complete output before the process
//! exits. Stage progress goes to stderr; errors map to distinct exit
//! codes via the error type.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::artifact_writer;
use crate::adapters::csv_adapter::CsvSeriesAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::fred_adapter::FredAdapter;
use crate::adapters::ollama_adapter::OllamaAdapter;
use crate::adapters::sqlite_adapter::SqliteSeriesAdapter;
use crate::domain::config_validation::{
    parse_windows, validate_pipeline_config, validate_report_config,
};
use crate::domain::error::PricecastError;
use crate::domain::evaluate::evaluate;
use crate::domain::features::{build_feature_table, FeatureConfig};
use crate::domain::model::train_ridge;
use crate::domain::report::{build_bundle, build_prompt};
use crate::domain::series::RawSeries;
use crate::domain::split::{split_chronological, CutoffRule};
use crate::ports::config_port::ConfigPort;
use crate::ports::note_port::NotePort;
use crate::ports::series_port::SeriesPort;

#[derive(Parser, Debug)]
#[command(name = "pricecast", about = "Commodity price forecasting pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the configured FRED series into the local store
    Fetch {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        series_id: Option<String>,
    },
    /// Load a date,price CSV file into the local store
    Store {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        in_csv: PathBuf,
    },
    /// Build the feature table from the stored series
    Features {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Train the baseline model and write evaluation artifacts
    Train {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Generate the analyst note from evaluation artifacts
    Report {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the stored series date range
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Fetch { config, series_id } => run_fetch(&config, series_id.as_deref()),
        Command::Store { config, in_csv } => run_store(&config, &in_csv),
        Command::Features { config, output } => run_features(&config, output.as_deref()),
        Command::Train { config } => run_train(&config),
        Command::Report { config, output } => run_report(&config, output.as_deref()),
        Command::Info { config } => run_info(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn load_config(path: &Path) -> Result<FileConfigAdapter, PricecastError> {
    FileConfigAdapter::from_file(path).map_err(|e| PricecastError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn open_store(config: &dyn ConfigPort) -> Result<SqliteSeriesAdapter, PricecastError> {
    let store = SqliteSeriesAdapter::from_config(config)?;
    store.initialize_schema()?;
    Ok(store)
}

pub fn build_feature_config(config: &dyn ConfigPort) -> Result<FeatureConfig, PricecastError> {
    let lag_count = config.get_int("features", "lag_count", 5);
    if lag_count < 1 {
        return Err(PricecastError::ConfigInvalid {
            section: "features".to_string(),
            key: "lag_count".to_string(),
            reason: "lag_count must be at least 1".to_string(),
        });
    }
    let windows = config
        .get_string("features", "windows")
        .unwrap_or_else(|| "20".to_string());
    Ok(FeatureConfig {
        lag_count: lag_count as usize,
        windows: parse_windows(&windows)?,
    })
}

pub fn build_cutoff_rule(config: &dyn ConfigPort) -> Result<CutoffRule, PricecastError> {
    if let Some(cutoff) = config.get_string("split", "cutoff_date") {
        let date = NaiveDate::parse_from_str(&cutoff, "%Y-%m-%d").map_err(|_| {
            PricecastError::ConfigInvalid {
                section: "split".to_string(),
                key: "cutoff_date".to_string(),
                reason: "invalid cutoff_date format, expected YYYY-MM-DD".to_string(),
            }
        })?;
        return Ok(CutoffRule::Date(date));
    }

    let test_size = config.get_double("split", "test_size", 0.2);
    if test_size <= 0.0 || test_size >= 1.0 {
        return Err(PricecastError::ConfigInvalid {
            section: "split".to_string(),
            key: "test_size".to_string(),
            reason: "test_size must be strictly between 0 and 1".to_string(),
        });
    }
    Ok(CutoffRule::Fraction(test_size))
}

fn features_csv_path(config: &dyn ConfigPort) -> PathBuf {
    PathBuf::from(
        config
            .get_string("features", "out_csv")
            .unwrap_or_else(|| "reports/features.csv".to_string()),
    )
}

fn run_fetch(config_path: &Path, series_override: Option<&str>) -> Result<(), PricecastError> {
    let config = load_config(config_path)?;
    validate_pipeline_config(&config)?;

    let series_id = match series_override {
        Some(id) => id.to_string(),
        None => config
            .get_string("series", "id")
            .ok_or_else(|| PricecastError::ConfigMissing {
                section: "series".to_string(),
                key: "id".to_string(),
            })?,
    };

    eprintln!("Fetching FRED series {series_id}");
    let fred = FredAdapter::new()?;
    let points = fred.fetch(&series_id)?;
    eprintln!("Fetched {} observations", points.len());

    let series = RawSeries::new(points)?;
    let store = open_store(&config)?;
    store.replace_series(series.points())?;
    eprintln!("Stored {} rows", series.len());
    Ok(())
}

fn run_store(config_path: &Path, in_csv: &Path) -> Result<(), PricecastError> {
    let config = load_config(config_path)?;
    validate_pipeline_config(&config)?;

    eprintln!("Loading series from {}", in_csv.display());
    let points = CsvSeriesAdapter::new(in_csv).read_points()?;
    let series = RawSeries::new(points)?;

    let store = open_store(&config)?;
    store.replace_series(series.points())?;
    eprintln!("Stored {} rows", series.len());
    Ok(())
}

fn run_features(config_path: &Path, output: Option<&Path>) -> Result<(), PricecastError> {
    let config = load_config(config_path)?;
    validate_pipeline_config(&config)?;

    let store = open_store(&config)?;
    let series = RawSeries::new(store.fetch_series()?)?;
    eprintln!("Loaded {} observations", series.len());

    let feature_config = build_feature_config(&config)?;
    let build = build_feature_table(&series, &feature_config)?;
    for dropped in &build.dropped {
        eprintln!("warning: dropped {}: {}", dropped.date, dropped.reason);
    }

    let out_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| features_csv_path(&config));
    artifact_writer::write_feature_table(&out_path, &build.table)?;
    eprintln!(
        "Wrote features: {} rows, {} columns -> {}",
        build.table.rows.len(),
        build.table.feature_names.len(),
        out_path.display()
    );
    Ok(())
}

fn run_train(config_path: &Path) -> Result<(), PricecastError> {
    let config = load_config(config_path)?;
    validate_pipeline_config(&config)?;

    let features_path = features_csv_path(&config);
    eprintln!("Loading features from {}", features_path.display());
    let table = artifact_writer::read_feature_table(&features_path)?;

    let rule = build_cutoff_rule(&config)?;
    let split = split_chronological(&table, rule)?;
    eprintln!(
        "Split: {} train rows, {} test rows (test starts {})",
        split.train.rows.len(),
        split.test.rows.len(),
        split.cutoff
    );

    let alpha = config.get_double("model", "alpha", 1.0);
    let model = train_ridge(&split.train, alpha)?;
    let (predictions, metrics) = evaluate(&model, &split.test, split.train.rows.len())?;

    let preds_path = PathBuf::from(
        config
            .get_string("artifacts", "predictions_csv")
            .unwrap_or_else(|| "reports/preds.csv".to_string()),
    );
    let metrics_path = PathBuf::from(
        config
            .get_string("artifacts", "metrics_json")
            .unwrap_or_else(|| "reports/metrics.json".to_string()),
    );
    artifact_writer::write_predictions(&preds_path, &predictions)?;
    artifact_writer::write_metrics(&metrics_path, &metrics)?;

    eprintln!("Wrote predictions -> {}", preds_path.display());
    eprintln!("Wrote metrics -> {}", metrics_path.display());
    eprintln!("MAE={:.6} RMSE={:.6}", metrics.mae, metrics.rmse);
    Ok(())
}

fn run_report(config_path: &Path, output: Option<&Path>) -> Result<(), PricecastError> {
    let config = load_config(config_path)?;
    validate_report_config(&config)?;

    let metrics_path = PathBuf::from(
        config
            .get_string("artifacts", "metrics_json")
            .unwrap_or_else(|| "reports/metrics.json".to_string()),
    );
    let preds_path = PathBuf::from(
        config
            .get_string("artifacts", "predictions_csv")
            .unwrap_or_else(|| "reports/preds.csv".to_string()),
    );
    let metrics = artifact_writer::read_metrics(&metrics_path)?;
    let predictions = artifact_writer::read_predictions(&preds_path)?;

    let asset = config
        .get_string("series", "label")
        .or_else(|| config.get_string("series", "id"))
        .unwrap_or_else(|| "unknown series".to_string());
    let unit = config
        .get_string("series", "unit")
        .unwrap_or_else(|| "unspecified".to_string());
    let recent_periods = config.get_int("report", "recent_periods", 12) as usize;

    let bundle = build_bundle(
        &asset,
        &unit,
        &metrics,
        &predictions,
        recent_periods,
        Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    let prompt = build_prompt(&bundle)?;

    let host = config
        .get_string("report", "host")
        .unwrap_or_else(|| "http://localhost:11434".to_string());
    let model = config
        .get_string("report", "model")
        .unwrap_or_else(|| "llama3.1:8b".to_string());
    eprintln!("Generating note with {model} at {host}");
    let ollama = OllamaAdapter::new(&host, &model)?;
    let note = ollama.generate(&prompt)?;

    let out_path = output.map(Path::to_path_buf).unwrap_or_else(|| {
        PathBuf::from(
            config
                .get_string("report", "out_md")
                .unwrap_or_else(|| "reports/note.md".to_string()),
        )
    });
    artifact_writer::write_note(&out_path, &note)?;
    eprintln!("Wrote note -> {}", out_path.display());
    Ok(())
}

fn run_info(config_path: &Path) -> Result<(), PricecastError> {
    let config = load_config(config_path)?;
    validate_pipeline_config(&config)?;

    let series_id = config
        .get_string("series", "id")
        .unwrap_or_else(|| "?".to_string());
    let store = open_store(&config)?;
    match store.series_range()? {
        Some((first, last, count)) => {
            println!("{series_id}: {count} rows from {first} to {last}");
        }
        None => {
            println!("{series_id}: no data stored");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn feature_config_uses_defaults() {
        let config = make_config("[features]\n");
        let fc = build_feature_config(&config).unwrap();
        assert_eq!(fc.lag_count, 5);
        assert_eq!(fc.windows, vec![20]);
    }

    #[test]
    fn feature_config_reads_values() {
        let config = make_config("[features]\nlag_count = 3\nwindows = 5,10\n");
        let fc = build_feature_config(&config).unwrap();
        assert_eq!(fc.lag_count, 3);
        assert_eq!(fc.windows, vec![5, 10]);
    }

    #[test]
    fn feature_config_rejects_zero_lags() {
        let config = make_config("[features]\nlag_count = 0\n");
        assert!(build_feature_config(&config).is_err());
    }

    #[test]
    fn cutoff_rule_defaults_to_fraction() {
        let config = make_config("[split]\n");
        assert_eq!(
            build_cutoff_rule(&config).unwrap(),
            CutoffRule::Fraction(0.2)
        );
    }

    #[test]
    fn cutoff_rule_prefers_explicit_date() {
        let config = make_config("[split]\ncutoff_date = 2023-06-01\ntest_size = 0.3\n");
        assert_eq!(
            build_cutoff_rule(&config).unwrap(),
            CutoffRule::Date(NaiveDate::from_ymd_opt(2023, 6, 1).unwrap())
        );
    }

    #[test]
    fn cutoff_rule_rejects_bad_fraction() {
        let config = make_config("[split]\ntest_size = 1.2\n");
        assert!(build_cutoff_rule(&config).is_err());
    }
}
