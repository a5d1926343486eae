//! Analysis bundle and prompt construction for the analyst note.
//!
//! The note generator is handed a compact JSON bundle of summary facts
//! (metrics plus recent-window errors) rather than raw datasets, so the
//! generated prose stays grounded in the numbers the pipeline produced.
//! Everything here is deterministic given the evaluation artifacts; the
//! generation timestamp is injected by the caller.

use crate::domain::error::PricecastError;
use crate::domain::evaluate::{MetricsSummary, PredictionRow};
use serde::Serialize;

pub const SYSTEM_PROMPT: &str = "\
You are an analytical assistant writing concise, professional market analysis notes.

Rules:
- Use only the provided numbers and facts.
- Do not speculate on causes.
- Do not give investment advice or trading recommendations.
- Use formal, professional language.
- Write dates in full, unambiguous form (e.g., \"November 2024\" or \"November 2024-May 2025\").
- Avoid abbreviations such as \"Nov 24\".

Output format (markdown):
1) Market behaviour (3-5 bullets)
2) Model performance (2-4 bullets)
3) Confidence & risks (2-4 bullets)
";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestPeriod {
    pub start: String,
    pub end: String,
    pub rows_test: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub n_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentPoint {
    pub date: String,
    pub y_true: f64,
    pub y_pred: f64,
    pub abs_error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentErrorSummary {
    pub mean_abs_error: f64,
    pub max_abs_error: f64,
    pub last_date: String,
}

/// Summary facts handed to the note generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisBundle {
    pub asset: String,
    pub price_unit: String,
    pub target_variable: String,
    pub generated_at: String,
    pub test_period: TestPeriod,
    pub model: String,
    pub metrics: BundleMetrics,
    pub recent_periods: usize,
    pub recent_error_summary: Option<RecentErrorSummary>,
    pub recent_points: Vec<RecentPoint>,
}

/// Summarize the last `recent_periods` test rows alongside the aggregate
/// metrics.
pub fn build_bundle(
    asset: &str,
    price_unit: &str,
    metrics: &MetricsSummary,
    predictions: &[PredictionRow],
    recent_periods: usize,
    generated_at: String,
) -> AnalysisBundle {
    let tail_start = predictions.len().saturating_sub(recent_periods);
    let recent_points: Vec<RecentPoint> = predictions[tail_start..]
        .iter()
        .map(|p| RecentPoint {
            date: p.date.format("%Y-%m-%d").to_string(),
            y_true: p.y_true,
            y_pred: p.y_pred,
            abs_error: (p.y_true - p.y_pred).abs(),
        })
        .collect();

    let recent_error_summary = recent_points.last().map(|last| {
        let mean_abs_error = recent_points.iter().map(|p| p.abs_error).sum::<f64>()
            / recent_points.len() as f64;
        let max_abs_error = recent_points
            .iter()
            .map(|p| p.abs_error)
            .fold(f64::MIN, f64::max);
        RecentErrorSummary {
            mean_abs_error,
            max_abs_error,
            last_date: last.date.clone(),
        }
    });

    AnalysisBundle {
        asset: asset.to_string(),
        price_unit: price_unit.to_string(),
        target_variable: "next-period log returns (not prices)".to_string(),
        generated_at,
        test_period: TestPeriod {
            start: metrics.test_period_start.clone(),
            end: metrics.test_period_end.clone(),
            rows_test: metrics.rows_test,
        },
        model: metrics.model.clone(),
        metrics: BundleMetrics {
            mae: metrics.mae,
            rmse: metrics.rmse,
            n_features: metrics.n_features,
        },
        recent_periods,
        recent_error_summary,
        recent_points,
    }
}

/// Render the full prompt: system rules, task, and the JSON bundle.
pub fn build_prompt(bundle: &AnalysisBundle) -> Result<String, PricecastError> {
    let json =
        serde_json::to_string_pretty(bundle).map_err(|e| PricecastError::NoteGeneration {
            reason: format!("failed to serialize analysis bundle: {e}"),
        })?;
    Ok(format!(
        "{SYSTEM_PROMPT}\nWrite the analyst note for the following evaluation summary:\n\n```json\n{json}\n```\n"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn predictions(n: usize) -> Vec<PredictionRow> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| PredictionRow {
                date: start + chrono::Duration::days(i as i64),
                y_true: 0.01 * (i as f64 + 1.0),
                y_pred: 0.01 * i as f64,
            })
            .collect()
    }

    fn sample_metrics() -> MetricsSummary {
        MetricsSummary {
            rows_total: 100,
            rows_train: 80,
            rows_test: 20,
            model: "Ridge(alpha=1)".to_string(),
            mae: 0.012,
            rmse: 0.018,
            test_period_start: "2024-01-01".to_string(),
            test_period_end: "2024-01-20".to_string(),
            n_features: 7,
            features_used: vec!["r_lag_1".to_string()],
            largest_errors: vec![],
        }
    }

    #[test]
    fn bundle_keeps_only_recent_tail() {
        let preds = predictions(20);
        let bundle = build_bundle(
            "Coffee (Arabica)",
            "US cents per pound",
            &sample_metrics(),
            &preds,
            12,
            "2024-02-01 00:00 UTC".to_string(),
        );

        assert_eq!(bundle.recent_points.len(), 12);
        assert_eq!(bundle.recent_points[0].date, "2024-01-09");
        assert_eq!(bundle.recent_points[11].date, "2024-01-20");
    }

    #[test]
    fn bundle_error_summary_matches_tail() {
        let preds = predictions(3);
        let bundle = build_bundle(
            "Coffee (Arabica)",
            "US cents per pound",
            &sample_metrics(),
            &preds,
            12,
            "2024-02-01 00:00 UTC".to_string(),
        );

        // every prediction is 0.01 under truth
        let summary = bundle.recent_error_summary.unwrap();
        assert!((summary.mean_abs_error - 0.01).abs() < 1e-12);
        assert!((summary.max_abs_error - 0.01).abs() < 1e-12);
        assert_eq!(summary.last_date, "2024-01-03");
    }

    #[test]
    fn bundle_without_predictions_has_no_error_summary() {
        let bundle = build_bundle(
            "Coffee (Arabica)",
            "US cents per pound",
            &sample_metrics(),
            &[],
            12,
            "2024-02-01 00:00 UTC".to_string(),
        );

        assert!(bundle.recent_error_summary.is_none());
        assert!(bundle.recent_points.is_empty());
    }

    #[test]
    fn prompt_embeds_rules_and_bundle_json() {
        let preds = predictions(2);
        let bundle = build_bundle(
            "Coffee (Arabica)",
            "US cents per pound",
            &sample_metrics(),
            &preds,
            12,
            "2024-02-01 00:00 UTC".to_string(),
        );
        let prompt = build_prompt(&bundle).unwrap();

        assert!(prompt.contains("Do not give investment advice"));
        assert!(prompt.contains("\"asset\": \"Coffee (Arabica)\""));
        assert!(prompt.contains("```json"));
    }
}
