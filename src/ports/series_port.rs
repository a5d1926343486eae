//! Series store port trait.

use crate::domain::error::PricecastError;
use crate::domain::series::SeriesPoint;
use chrono::NaiveDate;

pub trait SeriesPort {
    /// The stored series ordered by date ascending.
    fn fetch_series(&self) -> Result<Vec<SeriesPoint>, PricecastError>;

    /// (first date, last date, row count), or `None` when the store is empty.
    fn series_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, PricecastError>;
}
