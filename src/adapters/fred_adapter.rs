//! FRED series download adapter.
//!
//! Fetches the two-column fredgraph CSV for a series id. Missing
//! observations are encoded as "." upstream and are skipped, matching the
//! documented ingestion contract (absent days stay absent, no
//! interpolation).

use crate::domain::error::PricecastError;
use crate::domain::series::SeriesPoint;
use chrono::NaiveDate;
use std::time::Duration;

const FRED_CSV_URL: &str = "https://fred.stlouisfed.org/graph/fredgraph.csv?id=";

pub struct FredAdapter {
    client: reqwest::blocking::Client,
}

impl FredAdapter {
    pub fn new() -> Result<Self, PricecastError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PricecastError::Fetch {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    pub fn fetch(&self, series_id: &str) -> Result<Vec<SeriesPoint>, PricecastError> {
        let url = format!("{FRED_CSV_URL}{series_id}");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| PricecastError::Fetch {
                reason: format!("request for {series_id} failed: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(PricecastError::Fetch {
                reason: format!("{series_id}: HTTP {}", response.status()),
            });
        }

        let body = response.text().map_err(|e| PricecastError::Fetch {
            reason: format!("failed to read response body for {series_id}: {e}"),
        })?;

        parse_fred_csv(series_id, &body)
    }
}

/// Parse a fredgraph CSV body into series points. Rows whose value is
/// missing (".") or unparseable are skipped.
pub fn parse_fred_csv(series_id: &str, body: &str) -> Result<Vec<SeriesPoint>, PricecastError> {
    let mut rdr = csv::Reader::from_reader(body.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| PricecastError::Fetch {
            reason: format!("unreadable CSV header for {series_id}: {e}"),
        })?
        .clone();
    if headers.len() != 2 {
        return Err(PricecastError::Fetch {
            reason: format!(
                "unexpected CSV format for {series_id}: {} columns",
                headers.len()
            ),
        });
    }

    let mut points = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| PricecastError::Fetch {
            reason: format!("CSV parse error for {series_id}: {e}"),
        })?;

        let date_str = record.get(0).unwrap_or("");
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
            PricecastError::Fetch {
                reason: format!("invalid date '{date_str}' for {series_id}: {e}"),
            }
        })?;

        let value = record.get(1).unwrap_or("").trim();
        if value == "." {
            continue;
        }
        let Ok(price) = value.parse::<f64>() else {
            continue;
        };
        if !price.is_finite() {
            continue;
        }

        points.push(SeriesPoint { date, price });
    }

    Ok(points)
}
