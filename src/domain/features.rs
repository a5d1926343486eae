//! Feature engineering: log returns, lags, rolling statistics, calendar.
//!
//! The feature table is rebuilt from scratch on every run. Rows whose full
//! lookback window is unavailable are dropped, never zero-filled, and the
//! target is the next period's log return, so the last return of the series
//! never appears as a trainable row.

use crate::domain::error::PricecastError;
use crate::domain::series::RawSeries;
use chrono::{Datelike, NaiveDate};

/// Feature layout configuration: lag count k and rolling window lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    pub lag_count: usize,
    pub windows: Vec<usize>,
}

impl FeatureConfig {
    /// Ordered feature column names. Training and inference both follow
    /// this order; it is recorded in the model artifact.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.lag_count + 2 * self.windows.len() + 1);
        for lag in 1..=self.lag_count {
            names.push(format!("r_lag_{lag}"));
        }
        for window in &self.windows {
            names.push(format!("r_roll_mean_{window}"));
            names.push(format!("r_roll_std_{window}"));
        }
        names.push("month".to_string());
        names
    }

    /// Number of leading returns consumed before the first eligible row.
    pub fn warmup(&self) -> usize {
        let window_warmup = self
            .windows
            .iter()
            .map(|w| w.saturating_sub(1))
            .max()
            .unwrap_or(0);
        self.lag_count.max(window_warmup)
    }
}

/// One engineered row: everything except the target is computable from
/// information available at or before `date`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    /// Next-period log return.
    pub target: f64,
    pub features: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub feature_names: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

/// A row excluded from the feature table, with the reason.
#[derive(Debug, Clone)]
pub struct DroppedRow {
    pub date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct FeatureBuild {
    pub table: FeatureTable,
    /// Rows dropped for numeric anomalies, to be surfaced as warnings.
    pub dropped: Vec<DroppedRow>,
}

/// Derive the feature table and target from a validated price series.
///
/// Log return r(t) = ln(price(t) / price(t-1)); the first observation has
/// no return. Each eligible row carries lag features r(t-1)..r(t-k),
/// rolling mean and sample standard deviation of r over each configured
/// trailing window (window inclusive of r(t)), and the calendar month.
pub fn build_feature_table(
    series: &RawSeries,
    config: &FeatureConfig,
) -> Result<FeatureBuild, PricecastError> {
    let points = series.points();
    let mut returns = Vec::with_capacity(points.len().saturating_sub(1));
    for pair in points.windows(2) {
        returns.push((pair[1].price / pair[0].price).ln());
    }

    let warmup = config.warmup();
    let feature_names = config.feature_names();
    let mut rows = Vec::new();
    let mut dropped = Vec::new();

    // returns[t] is realised on points[t + 1].date; the row additionally
    // needs returns[t + 1] as its target.
    for t in warmup..returns.len().saturating_sub(1) {
        let date = points[t + 1].date;
        match compute_row(&returns, t, date, config) {
            Ok(row) => rows.push(row),
            Err(err) => dropped.push(DroppedRow {
                date,
                reason: err.to_string(),
            }),
        }
    }

    if rows.is_empty() {
        return Err(PricecastError::InsufficientData {
            stage: "feature build".to_string(),
            have: points.len(),
            need: warmup + 3,
        });
    }

    Ok(FeatureBuild {
        table: FeatureTable {
            feature_names,
            rows,
        },
        dropped,
    })
}

fn compute_row(
    returns: &[f64],
    t: usize,
    date: NaiveDate,
    config: &FeatureConfig,
) -> Result<FeatureRow, PricecastError> {
    let mut features = Vec::with_capacity(config.lag_count + 2 * config.windows.len() + 1);

    for lag in 1..=config.lag_count {
        features.push(returns[t - lag]);
    }

    for &window in &config.windows {
        let slice = &returns[t + 1 - window..=t];
        let mean = slice.iter().sum::<f64>() / window as f64;
        // sample standard deviation (ddof = 1)
        let variance = slice
            .iter()
            .map(|r| {
                let diff = r - mean;
                diff * diff
            })
            .sum::<f64>()
            / (window as f64 - 1.0);
        features.push(mean);
        features.push(variance.sqrt());
    }

    features.push(date.month() as f64);

    let target = returns[t + 1];
    if !target.is_finite() || features.iter().any(|v| !v.is_finite()) {
        return Err(PricecastError::NumericComputation {
            context: format!("feature row for {date}"),
        });
    }

    Ok(FeatureRow {
        date,
        target,
        features,
    })
}
