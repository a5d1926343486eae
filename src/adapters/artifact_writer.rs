//! Artifact persistence: feature table, predictions, metrics, note.
//!
//! Writers are pure, order-preserving serializations of their inputs.
//! Every write goes to a temp sibling and is renamed into place, so a
//! failed write never leaves a partial artifact visible to downstream
//! consumers. Floats use Rust's shortest round-trip formatting, and each
//! writer has a matching reader, so persistence is lossless.

use crate::domain::error::PricecastError;
use crate::domain::evaluate::{MetricsSummary, PredictionRow};
use crate::domain::features::{FeatureRow, FeatureTable};
use chrono::NaiveDate;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

fn tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), PricecastError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn csv_bytes(wtr: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, PricecastError> {
    wtr.into_inner()
        .map_err(|e| PricecastError::Io(std::io::Error::other(e)))
}

fn write_error(e: csv::Error) -> PricecastError {
    PricecastError::Io(std::io::Error::other(e))
}

fn parse_date(value: &str, path: &Path) -> Result<NaiveDate, PricecastError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| PricecastError::DataIntegrity {
        reason: format!("invalid date '{value}' in {}: {e}", path.display()),
    })
}

fn parse_float(value: &str, path: &Path) -> Result<f64, PricecastError> {
    value.parse().map_err(|e| PricecastError::DataIntegrity {
        reason: format!("invalid number '{value}' in {}: {e}", path.display()),
    })
}

pub fn write_feature_table(path: &Path, table: &FeatureTable) -> Result<(), PricecastError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["date".to_string(), "y_next_return".to_string()];
    header.extend(table.feature_names.iter().cloned());
    wtr.write_record(&header).map_err(write_error)?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(2 + row.features.len());
        record.push(row.date.format("%Y-%m-%d").to_string());
        record.push(row.target.to_string());
        record.extend(row.features.iter().map(|v| v.to_string()));
        wtr.write_record(&record).map_err(write_error)?;
    }

    atomic_write(path, &csv_bytes(wtr)?)
}

pub fn read_feature_table(path: &Path) -> Result<FeatureTable, PricecastError> {
    let content = fs::read_to_string(path).map_err(|e| PricecastError::DataIntegrity {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;
    let mut rdr = csv::Reader::from_reader(content.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| PricecastError::DataIntegrity {
            reason: format!("unreadable header in {}: {e}", path.display()),
        })?
        .clone();
    if headers.len() < 3 || &headers[0] != "date" || &headers[1] != "y_next_return" {
        return Err(PricecastError::DataIntegrity {
            reason: format!(
                "{} is not a feature table: expected date,y_next_return,... header",
                path.display()
            ),
        });
    }
    let feature_names: Vec<String> = headers.iter().skip(2).map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| PricecastError::DataIntegrity {
            reason: format!("CSV parse error in {}: {e}", path.display()),
        })?;
        if record.len() != headers.len() {
            return Err(PricecastError::DataIntegrity {
                reason: format!(
                    "ragged row in {}: {} fields, expected {}",
                    path.display(),
                    record.len(),
                    headers.len()
                ),
            });
        }

        let date = parse_date(&record[0], path)?;
        let target = parse_float(&record[1], path)?;
        let mut features = Vec::with_capacity(feature_names.len());
        for value in record.iter().skip(2) {
            features.push(parse_float(value, path)?);
        }
        rows.push(FeatureRow {
            date,
            target,
            features,
        });
    }

    Ok(FeatureTable {
        feature_names,
        rows,
    })
}

pub fn write_predictions(path: &Path, predictions: &[PredictionRow]) -> Result<(), PricecastError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["date", "y_true", "y_pred"])
        .map_err(write_error)?;

    for row in predictions {
        wtr.write_record([
            row.date.format("%Y-%m-%d").to_string(),
            row.y_true.to_string(),
            row.y_pred.to_string(),
        ])
        .map_err(write_error)?;
    }

    atomic_write(path, &csv_bytes(wtr)?)
}

pub fn read_predictions(path: &Path) -> Result<Vec<PredictionRow>, PricecastError> {
    let content = fs::read_to_string(path).map_err(|e| PricecastError::DataIntegrity {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;
    let mut rdr = csv::Reader::from_reader(content.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| PricecastError::DataIntegrity {
            reason: format!("unreadable header in {}: {e}", path.display()),
        })?
        .clone();
    if headers.len() != 3 || &headers[0] != "date" {
        return Err(PricecastError::DataIntegrity {
            reason: format!(
                "{} is not a predictions table: expected date,y_true,y_pred header",
                path.display()
            ),
        });
    }

    let mut predictions = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| PricecastError::DataIntegrity {
            reason: format!("CSV parse error in {}: {e}", path.display()),
        })?;
        predictions.push(PredictionRow {
            date: parse_date(&record[0], path)?,
            y_true: parse_float(&record[1], path)?,
            y_pred: parse_float(&record[2], path)?,
        });
    }

    Ok(predictions)
}

pub fn write_metrics(path: &Path, metrics: &MetricsSummary) -> Result<(), PricecastError> {
    let json = serde_json::to_vec_pretty(metrics)
        .map_err(|e| PricecastError::Io(std::io::Error::other(e)))?;
    atomic_write(path, &json)
}

pub fn read_metrics(path: &Path) -> Result<MetricsSummary, PricecastError> {
    let content = fs::read_to_string(path).map_err(|e| PricecastError::DataIntegrity {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;
    serde_json::from_str(&content).map_err(|e| PricecastError::DataIntegrity {
        reason: format!("malformed metrics record {}: {e}", path.display()),
    })
}

pub fn write_note(path: &Path, note: &str) -> Result<(), PricecastError> {
    atomic_write(path, note.as_bytes())
}
