#![allow(dead_code)]

use chrono::NaiveDate;
use pricecast::domain::features::FeatureConfig;
use pricecast::domain::series::{RawSeries, SeriesPoint};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_point(date_str: &str, price: f64) -> SeriesPoint {
    SeriesPoint {
        date: NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap(),
        price,
    }
}

/// Consecutive daily points starting 2024-01-01.
pub fn series_of(prices: &[f64]) -> RawSeries {
    let start = date(2024, 1, 1);
    let points = prices
        .iter()
        .enumerate()
        .map(|(i, &price)| SeriesPoint {
            date: start + chrono::Duration::days(i as i64),
            price,
        })
        .collect();
    RawSeries::new(points).unwrap()
}

/// A deterministic wavy price path long enough for the default feature
/// layout: drift plus a small repeating swing, always positive.
pub fn synthetic_prices(n: usize) -> Vec<f64> {
    let mut prices = Vec::with_capacity(n);
    let mut price = 150.0;
    for i in 0..n {
        let swing = 0.004 * ((i % 9) as f64 - 4.0);
        price *= (0.0005 + swing).exp();
        prices.push(price);
    }
    prices
}

pub fn default_feature_config() -> FeatureConfig {
    FeatureConfig {
        lag_count: 5,
        windows: vec![20],
    }
}
