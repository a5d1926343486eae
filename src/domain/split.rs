//! Chronological train/test split. No shuffling, no leakage: the train
//! segment entirely precedes the test segment in time.

use crate::domain::error::PricecastError;
use crate::domain::features::FeatureTable;
use chrono::NaiveDate;

/// Rule selecting where the test period begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CutoffRule {
    /// Rows dated strictly before the given date train; the rest test.
    Date(NaiveDate),
    /// Fraction of rows reserved for the test set, taken from the end.
    Fraction(f64),
}

#[derive(Debug, Clone)]
pub struct Split {
    pub train: FeatureTable,
    pub test: FeatureTable,
    /// First date of the test segment.
    pub cutoff: NaiveDate,
}

/// Partition a date-ordered feature table into train and test segments.
///
/// Contract: train = all rows with date < cutoff, test = all rows with
/// date >= cutoff. For [`CutoffRule::Fraction`] the cutoff is the date of
/// the first reserved row, so the same contract holds. An empty side is an
/// error, never an empty result.
pub fn split_chronological(
    table: &FeatureTable,
    rule: CutoffRule,
) -> Result<Split, PricecastError> {
    let n = table.rows.len();
    let boundary = match rule {
        CutoffRule::Date(cutoff) => table.rows.partition_point(|row| row.date < cutoff),
        CutoffRule::Fraction(test_size) => {
            let n_test = ((n as f64 * test_size).round() as usize).max(1);
            n.saturating_sub(n_test)
        }
    };

    if boundary == 0 {
        return Err(PricecastError::InsufficientData {
            stage: "train split".to_string(),
            have: 0,
            need: 1,
        });
    }
    if boundary >= n {
        return Err(PricecastError::InsufficientData {
            stage: "test split".to_string(),
            have: 0,
            need: 1,
        });
    }

    let (train_rows, test_rows) = table.rows.split_at(boundary);
    Ok(Split {
        train: FeatureTable {
            feature_names: table.feature_names.clone(),
            rows: train_rows.to_vec(),
        },
        test: FeatureTable {
            feature_names: table.feature_names.clone(),
            rows: test_rows.to_vec(),
        },
        cutoff: test_rows[0].date,
    })
}
