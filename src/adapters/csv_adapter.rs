//! CSV series file adapter.
//!
//! Reads a two-column `date,price` file in file order. Ordering and price
//! validation happen in [`RawSeries::new`], so a malformed file is caught
//! at load time rather than silently reordered here.
//!
//! [`RawSeries::new`]: crate::domain::series::RawSeries::new

use crate::domain::error::PricecastError;
use crate::domain::series::SeriesPoint;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvSeriesAdapter {
    path: PathBuf,
}

impl CsvSeriesAdapter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn read_points(&self) -> Result<Vec<SeriesPoint>, PricecastError> {
        let content =
            fs::read_to_string(&self.path).map_err(|e| PricecastError::DataIntegrity {
                reason: format!("failed to read {}: {}", self.path.display(), e),
            })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut points = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| PricecastError::DataIntegrity {
                reason: format!("CSV parse error in {}: {}", self.path.display(), e),
            })?;

            let date_str = record.get(0).ok_or_else(|| PricecastError::DataIntegrity {
                reason: "missing date column".to_string(),
            })?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                PricecastError::DataIntegrity {
                    reason: format!("invalid date '{date_str}': {e}"),
                }
            })?;

            let price_str = record.get(1).ok_or_else(|| PricecastError::DataIntegrity {
                reason: format!("missing price column on {date}"),
            })?;
            let price: f64 = price_str
                .parse()
                .map_err(|e| PricecastError::DataIntegrity {
                    reason: format!("invalid price '{price_str}' on {date}: {e}"),
                })?;

            points.push(SeriesPoint { date, price });
        }

        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("series.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn reads_date_price_rows_in_file_order() {
        let (_dir, path) = write_csv(
            "date,price\n\
             2024-01-15,182.4\n\
             2024-01-16,184.05\n\
             2024-01-17,183.9\n",
        );
        let points = CsvSeriesAdapter::new(&path).read_points().unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(
            points[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert_eq!(points[0].price, 182.4);
        assert_eq!(points[2].price, 183.9);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvSeriesAdapter::new(dir.path().join("absent.csv"));
        let err = adapter.read_points().unwrap_err();
        assert!(matches!(err, PricecastError::DataIntegrity { .. }));
    }

    #[test]
    fn malformed_date_is_an_error() {
        let (_dir, path) = write_csv("date,price\n15/01/2024,182.4\n");
        let err = CsvSeriesAdapter::new(&path).read_points().unwrap_err();
        assert!(matches!(err, PricecastError::DataIntegrity { .. }));
    }

    #[test]
    fn malformed_price_is_an_error() {
        let (_dir, path) = write_csv("date,price\n2024-01-15,n/a\n");
        let err = CsvSeriesAdapter::new(&path).read_points().unwrap_err();
        assert!(matches!(err, PricecastError::DataIntegrity { .. }));
    }

    #[test]
    fn header_only_file_yields_no_points() {
        let (_dir, path) = write_csv("date,price\n");
        let points = CsvSeriesAdapter::new(&path).read_points().unwrap();
        assert!(points.is_empty());
    }
}
