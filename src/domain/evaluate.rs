//! Prediction and error metrics over the test period.

use crate::domain::error::PricecastError;
use crate::domain::features::FeatureTable;
use crate::domain::model::ModelArtifact;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of largest-error periods kept in the metrics record.
pub const LARGEST_ERROR_PERIODS: usize = 5;

/// One out-of-sample prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    pub date: NaiveDate,
    pub y_true: f64,
    pub y_pred: f64,
}

/// A test period ranked by prediction error, for outlier reporting.
/// `abs_pct_error` is |true − pred| / |true|; it is undefined when the true
/// value is zero and omitted for such rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodError {
    pub date: String,
    pub abs_error: f64,
    pub abs_pct_error: Option<f64>,
}

/// Aggregate evaluation record written alongside the predictions table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub rows_total: usize,
    pub rows_train: usize,
    pub rows_test: usize,
    pub model: String,
    pub mae: f64,
    pub rmse: f64,
    pub test_period_start: String,
    pub test_period_end: String,
    pub n_features: usize,
    pub features_used: Vec<String>,
    pub largest_errors: Vec<PeriodError>,
}

/// Predict every test row with the artifact's recorded feature ordering
/// and compute aggregate errors.
///
/// MAE = mean(|true − pred|), RMSE = sqrt(mean((true − pred)²)). Rows with
/// a zero true value are excluded from percentage-error reporting but still
/// counted in MAE and RMSE.
pub fn evaluate(
    model: &ModelArtifact,
    test: &FeatureTable,
    rows_train: usize,
) -> Result<(Vec<PredictionRow>, MetricsSummary), PricecastError> {
    if model.feature_names != test.feature_names {
        return Err(PricecastError::SchemaMismatch {
            reason: format!(
                "model trained on [{}] but evaluation table has [{}]",
                model.feature_names.join(", "),
                test.feature_names.join(", ")
            ),
        });
    }
    if test.rows.is_empty() {
        return Err(PricecastError::InsufficientData {
            stage: "evaluation".to_string(),
            have: 0,
            need: 1,
        });
    }

    let mut predictions = Vec::with_capacity(test.rows.len());
    for row in &test.rows {
        if row.features.len() != model.feature_names.len() {
            return Err(PricecastError::SchemaMismatch {
                reason: format!(
                    "row {} has {} features, model expects {}",
                    row.date,
                    row.features.len(),
                    model.feature_names.len()
                ),
            });
        }
        predictions.push(PredictionRow {
            date: row.date,
            y_true: row.target,
            y_pred: model.predict(&row.features),
        });
    }

    let n = predictions.len() as f64;
    let mae = predictions
        .iter()
        .map(|p| (p.y_true - p.y_pred).abs())
        .sum::<f64>()
        / n;
    let rmse = (predictions
        .iter()
        .map(|p| {
            let err = p.y_true - p.y_pred;
            err * err
        })
        .sum::<f64>()
        / n)
        .sqrt();

    let mut ranked: Vec<PeriodError> = predictions
        .iter()
        .map(|p| {
            let abs_error = (p.y_true - p.y_pred).abs();
            let abs_pct_error = (p.y_true != 0.0).then(|| abs_error / p.y_true.abs());
            PeriodError {
                date: p.date.format("%Y-%m-%d").to_string(),
                abs_error,
                abs_pct_error,
            }
        })
        .collect();
    // stable sort: ties stay in chronological order
    ranked.sort_by(|a, b| b.abs_error.total_cmp(&a.abs_error));
    ranked.truncate(LARGEST_ERROR_PERIODS);

    let summary = MetricsSummary {
        rows_total: rows_train + predictions.len(),
        rows_train,
        rows_test: predictions.len(),
        model: model.label(),
        mae,
        rmse,
        test_period_start: predictions[0].date.format("%Y-%m-%d").to_string(),
        test_period_end: predictions[predictions.len() - 1]
            .date
            .format("%Y-%m-%d")
            .to_string(),
        n_features: model.feature_names.len(),
        features_used: model.feature_names.clone(),
        largest_errors: ranked,
    };

    Ok((predictions, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::FeatureRow;
    use approx::assert_relative_eq;
    use ndarray::Array1;

    fn identity_model(names: &[&str]) -> ModelArtifact {
        // predicts its single feature unchanged
        ModelArtifact {
            feature_names: names.iter().map(|n| n.to_string()).collect(),
            coefficients: Array1::from_vec(vec![1.0]),
            intercept: 0.0,
            alpha: 1.0,
        }
    }

    fn test_table(pairs: &[(f64, f64)]) -> FeatureTable {
        // feature value is fed through the identity model as the prediction
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let rows = pairs
            .iter()
            .enumerate()
            .map(|(i, &(y_true, y_pred))| FeatureRow {
                date: start + chrono::Duration::days(i as i64),
                target: y_true,
                features: vec![y_pred],
            })
            .collect();
        FeatureTable {
            feature_names: vec!["x".to_string()],
            rows,
        }
    }

    #[test]
    fn mae_and_rmse_match_known_values() {
        let table = test_table(&[(0.01, 0.015), (-0.02, -0.01), (0.03, 0.02)]);
        let model = identity_model(&["x"]);

        let (predictions, metrics) = evaluate(&model, &table, 12).unwrap();

        assert_eq!(predictions.len(), 3);
        assert_relative_eq!(metrics.mae, 0.025 / 3.0, max_relative = 1e-12);
        assert_relative_eq!(metrics.rmse, (2.25e-4_f64 / 3.0).sqrt(), max_relative = 1e-12);
        assert_eq!(metrics.rows_train, 12);
        assert_eq!(metrics.rows_test, 3);
        assert_eq!(metrics.rows_total, 15);
        assert_eq!(metrics.test_period_start, "2024-06-01");
        assert_eq!(metrics.test_period_end, "2024-06-03");
    }

    #[test]
    fn feature_ordering_mismatch_is_fatal() {
        let table = test_table(&[(0.01, 0.015)]);
        let model = identity_model(&["y"]);

        let err = evaluate(&model, &table, 1).unwrap_err();
        assert!(matches!(err, PricecastError::SchemaMismatch { .. }));
    }

    #[test]
    fn empty_test_set_is_insufficient_data() {
        let table = test_table(&[]);
        let model = identity_model(&["x"]);

        let err = evaluate(&model, &table, 10).unwrap_err();
        assert!(matches!(err, PricecastError::InsufficientData { .. }));
    }

    #[test]
    fn zero_true_value_excluded_from_percentage_error_only() {
        let table = test_table(&[(0.0, 0.01), (0.02, 0.01)]);
        let model = identity_model(&["x"]);

        let (_, metrics) = evaluate(&model, &table, 2).unwrap();

        // both rows count toward MAE
        assert_relative_eq!(metrics.mae, 0.01, max_relative = 1e-12);

        let zero_row = metrics
            .largest_errors
            .iter()
            .find(|e| e.date == "2024-06-01")
            .unwrap();
        assert_eq!(zero_row.abs_pct_error, None);

        let other = metrics
            .largest_errors
            .iter()
            .find(|e| e.date == "2024-06-02")
            .unwrap();
        assert_relative_eq!(other.abs_pct_error.unwrap(), 0.5, max_relative = 1e-12);
    }

    #[test]
    fn largest_errors_ranked_and_truncated() {
        let pairs: Vec<(f64, f64)> = (0..8).map(|i| (0.01, 0.01 + 0.001 * i as f64)).collect();
        let table = test_table(&pairs);
        let model = identity_model(&["x"]);

        let (_, metrics) = evaluate(&model, &table, 8).unwrap();

        assert_eq!(metrics.largest_errors.len(), LARGEST_ERROR_PERIODS);
        for pair in metrics.largest_errors.windows(2) {
            assert!(pair[0].abs_error >= pair[1].abs_error);
        }
        // worst period is the last one
        assert_eq!(metrics.largest_errors[0].date, "2024-06-08");
    }

    #[test]
    fn predictions_preserve_test_order() {
        let table = test_table(&[(0.01, 0.0), (0.02, 0.0), (0.03, 0.0)]);
        let model = identity_model(&["x"]);

        let (predictions, _) = evaluate(&model, &table, 3).unwrap();
        for pair in predictions.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
    }
}
