//! Configuration validation.
//!
//! Validates the full configuration surface before any stage runs, so a
//! bad value fails fast instead of partway through the pipeline.

use crate::domain::error::PricecastError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_pipeline_config(config: &dyn ConfigPort) -> Result<(), PricecastError> {
    validate_series(config)?;
    validate_sqlite(config)?;
    validate_features(config)?;
    validate_split(config)?;
    validate_model(config)?;
    Ok(())
}

pub fn validate_report_config(config: &dyn ConfigPort) -> Result<(), PricecastError> {
    let recent = config.get_int("report", "recent_periods", 12);
    if recent < 1 {
        return Err(PricecastError::ConfigInvalid {
            section: "report".to_string(),
            key: "recent_periods".to_string(),
            reason: "recent_periods must be at least 1".to_string(),
        });
    }
    if let Some(model) = config.get_string("report", "model") {
        if model.trim().is_empty() {
            return Err(PricecastError::ConfigInvalid {
                section: "report".to_string(),
                key: "model".to_string(),
                reason: "model must not be empty".to_string(),
            });
        }
    }
    Ok(())
}

/// Parse a comma-separated list of rolling window lengths. Sample standard
/// deviation needs at least two observations per window.
pub fn parse_windows(value: &str) -> Result<Vec<usize>, PricecastError> {
    let mut windows = Vec::new();
    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let window: usize = part
            .parse()
            .map_err(|_| PricecastError::ConfigInvalid {
                section: "features".to_string(),
                key: "windows".to_string(),
                reason: format!("invalid window length '{part}'"),
            })?;
        if window < 2 {
            return Err(PricecastError::ConfigInvalid {
                section: "features".to_string(),
                key: "windows".to_string(),
                reason: format!("window length {window} is below the minimum of 2"),
            });
        }
        windows.push(window);
    }
    if windows.is_empty() {
        return Err(PricecastError::ConfigInvalid {
            section: "features".to_string(),
            key: "windows".to_string(),
            reason: "at least one rolling window is required".to_string(),
        });
    }
    Ok(windows)
}

fn validate_series(config: &dyn ConfigPort) -> Result<(), PricecastError> {
    match config.get_string("series", "id") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(PricecastError::ConfigMissing {
            section: "series".to_string(),
            key: "id".to_string(),
        }),
    }
}

fn validate_sqlite(config: &dyn ConfigPort) -> Result<(), PricecastError> {
    match config.get_string("sqlite", "path") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(PricecastError::ConfigMissing {
            section: "sqlite".to_string(),
            key: "path".to_string(),
        }),
    }
}

fn validate_features(config: &dyn ConfigPort) -> Result<(), PricecastError> {
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
    parse_windows(&windows)?;
    Ok(())
}

fn validate_split(config: &dyn ConfigPort) -> Result<(), PricecastError> {
    if let Some(cutoff) = config.get_string("split", "cutoff_date") {
        NaiveDate::parse_from_str(&cutoff, "%Y-%m-%d").map_err(|_| {
            PricecastError::ConfigInvalid {
                section: "split".to_string(),
                key: "cutoff_date".to_string(),
                reason: "invalid cutoff_date format, expected YYYY-MM-DD".to_string(),
            }
        })?;
        return Ok(());
    }

    let test_size = config.get_double("split", "test_size", 0.2);
    if test_size <= 0.0 || test_size >= 1.0 {
        return Err(PricecastError::ConfigInvalid {
            section: "split".to_string(),
            key: "test_size".to_string(),
            reason: "test_size must be strictly between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_model(config: &dyn ConfigPort) -> Result<(), PricecastError> {
    let alpha = config.get_double("model", "alpha", 1.0);
    if !alpha.is_finite() || alpha < 0.0 {
        return Err(PricecastError::ConfigInvalid {
            section: "model".to_string(),
            key: "alpha".to_string(),
            reason: "alpha must be a non-negative number".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const MINIMAL: &str = "[series]\nid = PCOFFOTMUSDM\n\n[sqlite]\npath = data/pricecast.db\n";

    #[test]
    fn minimal_config_passes_with_defaults() {
        let config = make_config(MINIMAL);
        assert!(validate_pipeline_config(&config).is_ok());
    }

    #[test]
    fn full_config_passes() {
        let config = make_config(
            r#"
[series]
id = PCOFFOTMUSDM
unit = US cents per pound

[sqlite]
path = data/pricecast.db
table = prices

[features]
lag_count = 5
windows = 5,20

[split]
test_size = 0.2

[model]
alpha = 1.0
"#,
        );
        assert!(validate_pipeline_config(&config).is_ok());
    }

    #[test]
    fn missing_series_id_fails() {
        let config = make_config("[sqlite]\npath = data/pricecast.db\n");
        let err = validate_pipeline_config(&config).unwrap_err();
        assert!(matches!(err, PricecastError::ConfigMissing { key, .. } if key == "id"));
    }

    #[test]
    fn missing_sqlite_path_fails() {
        let config = make_config("[series]\nid = X\n");
        let err = validate_pipeline_config(&config).unwrap_err();
        assert!(matches!(err, PricecastError::ConfigMissing { key, .. } if key == "path"));
    }

    #[test]
    fn zero_lag_count_fails() {
        let config = make_config(&format!("{MINIMAL}[features]\nlag_count = 0\n"));
        let err = validate_pipeline_config(&config).unwrap_err();
        assert!(matches!(err, PricecastError::ConfigInvalid { key, .. } if key == "lag_count"));
    }

    #[test]
    fn window_of_one_fails() {
        let config = make_config(&format!("{MINIMAL}[features]\nwindows = 1\n"));
        let err = validate_pipeline_config(&config).unwrap_err();
        assert!(matches!(err, PricecastError::ConfigInvalid { key, .. } if key == "windows"));
    }

    #[test]
    fn non_numeric_window_fails() {
        let config = make_config(&format!("{MINIMAL}[features]\nwindows = 5,abc\n"));
        let err = validate_pipeline_config(&config).unwrap_err();
        assert!(matches!(err, PricecastError::ConfigInvalid { key, .. } if key == "windows"));
    }

    #[test]
    fn test_size_out_of_range_fails() {
        for value in ["0", "1", "1.5", "-0.1"] {
            let config = make_config(&format!("{MINIMAL}[split]\ntest_size = {value}\n"));
            let err = validate_pipeline_config(&config).unwrap_err();
            assert!(
                matches!(err, PricecastError::ConfigInvalid { key, .. } if key == "test_size"),
                "expected failure for test_size = {value}"
            );
        }
    }

    #[test]
    fn cutoff_date_takes_precedence_over_test_size() {
        let config = make_config(&format!(
            "{MINIMAL}[split]\ncutoff_date = 2023-06-01\ntest_size = 99\n"
        ));
        assert!(validate_pipeline_config(&config).is_ok());
    }

    #[test]
    fn malformed_cutoff_date_fails() {
        let config = make_config(&format!("{MINIMAL}[split]\ncutoff_date = 2023/06/01\n"));
        let err = validate_pipeline_config(&config).unwrap_err();
        assert!(matches!(err, PricecastError::ConfigInvalid { key, .. } if key == "cutoff_date"));
    }

    #[test]
    fn negative_alpha_fails() {
        let config = make_config(&format!("{MINIMAL}[model]\nalpha = -1\n"));
        let err = validate_pipeline_config(&config).unwrap_err();
        assert!(matches!(err, PricecastError::ConfigInvalid { key, .. } if key == "alpha"));
    }

    #[test]
    fn parse_windows_accepts_list() {
        assert_eq!(parse_windows("5, 20").unwrap(), vec![5, 20]);
        assert_eq!(parse_windows("20").unwrap(), vec![20]);
    }

    #[test]
    fn parse_windows_rejects_empty() {
        assert!(parse_windows("").is_err());
        assert!(parse_windows(" , ").is_err());
    }

    #[test]
    fn report_recent_periods_must_be_positive() {
        let config = make_config("[report]\nrecent_periods = 0\n");
        let err = validate_report_config(&config).unwrap_err();
        assert!(matches!(err, PricecastError::ConfigInvalid { key, .. } if key == "recent_periods"));
    }

    #[test]
    fn report_defaults_pass() {
        let config = make_config("[report]\n");
        assert!(validate_report_config(&config).is_ok());
    }
}
