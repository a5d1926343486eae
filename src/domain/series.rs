//! Raw daily price series representation and validation.

use crate::domain::error::PricecastError;
use chrono::NaiveDate;

/// A single (date, price) observation.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// A validated price series: dates strictly increasing with no duplicates,
/// prices strictly positive and finite. Immutable once constructed. All
/// downstream numeric work assumes a clean monotonic index, so a violation
/// here is fatal rather than recovered.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    points: Vec<SeriesPoint>,
}

impl RawSeries {
    pub fn new(points: Vec<SeriesPoint>) -> Result<Self, PricecastError> {
        for pair in points.windows(2) {
            if pair[1].date == pair[0].date {
                return Err(PricecastError::DataIntegrity {
                    reason: format!("duplicate date {}", pair[1].date),
                });
            }
            if pair[1].date < pair[0].date {
                return Err(PricecastError::DataIntegrity {
                    reason: format!(
                        "dates out of order: {} follows {}",
                        pair[1].date, pair[0].date
                    ),
                });
            }
        }

        for point in &points {
            if !point.price.is_finite() || point.price <= 0.0 {
                return Err(PricecastError::DataIntegrity {
                    reason: format!("non-positive price {} on {}", point.price, point.date),
                });
            }
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}
