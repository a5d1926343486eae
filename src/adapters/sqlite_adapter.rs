//! SQLite series store adapter.
//!
//! A pass-through store keyed by date. Loading replaces the whole table,
//! mirroring the upstream ingestion contract (no incremental update).

use crate::domain::error::PricecastError;
use crate::domain::series::SeriesPoint;
use crate::ports::config_port::ConfigPort;
use crate::ports::series_port::SeriesPort;
use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

#[derive(Debug)]
pub struct SqliteSeriesAdapter {
    pool: Pool<SqliteConnectionManager>,
    table: String,
}

fn validate_table_name(table: &str) -> Result<(), PricecastError> {
    let ok = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(PricecastError::ConfigInvalid {
            section: "sqlite".to_string(),
            key: "table".to_string(),
            reason: format!("invalid table name '{table}'"),
        })
    }
}

impl SqliteSeriesAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PricecastError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| PricecastError::ConfigMissing {
                    section: "sqlite".to_string(),
                    key: "path".to_string(),
                })?;
        let table = config
            .get_string("sqlite", "table")
            .unwrap_or_else(|| "prices".to_string());
        validate_table_name(&table)?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;
        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| PricecastError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool, table })
    }

    pub fn in_memory(table: &str) -> Result<Self, PricecastError> {
        validate_table_name(table)?;
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| PricecastError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), PricecastError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| PricecastError::Database {
                reason: e.to_string(),
            })?;

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                date TEXT NOT NULL PRIMARY KEY,
                price REAL NOT NULL
            );",
            self.table
        ))
        .map_err(|e: rusqlite::Error| PricecastError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    /// Replace the stored series with `points`, in one transaction.
    pub fn replace_series(&self, points: &[SeriesPoint]) -> Result<(), PricecastError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| PricecastError::Database {
                reason: e.to_string(),
            })?;

        let tx = conn
            .transaction()
            .map_err(|e: rusqlite::Error| PricecastError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        tx.execute(&format!("DELETE FROM {}", self.table), [])
            .map_err(|e: rusqlite::Error| PricecastError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        for point in points {
            tx.execute(
                &format!(
                    "INSERT INTO {} (date, price) VALUES (?1, ?2)",
                    self.table
                ),
                params![point.date.format("%Y-%m-%d").to_string(), point.price],
            )
            .map_err(|e: rusqlite::Error| PricecastError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| PricecastError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(())
    }
}

impl SeriesPort for SqliteSeriesAdapter {
    fn fetch_series(&self) -> Result<Vec<SeriesPoint>, PricecastError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| PricecastError::Database {
                reason: e.to_string(),
            })?;

        let query = format!(
            "SELECT date, price FROM {} ORDER BY date ASC",
            self.table
        );
        let mut stmt =
            conn.prepare(&query)
                .map_err(|e: rusqlite::Error| PricecastError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let rows = stmt
            .query_map([], |row| {
                let date_str: String = row.get(0)?;
                let price: f64 = row.get(1)?;
                Ok((date_str, price))
            })
            .map_err(|e: rusqlite::Error| PricecastError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut points = Vec::new();
        for row in rows {
            let (date_str, price) =
                row.map_err(|e: rusqlite::Error| PricecastError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
            let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                PricecastError::DataIntegrity {
                    reason: format!("stored date '{date_str}' is malformed: {e}"),
                }
            })?;
            points.push(SeriesPoint { date, price });
        }

        Ok(points)
    }

    fn series_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, PricecastError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| PricecastError::Database {
                reason: e.to_string(),
            })?;

        let query = format!(
            "SELECT MIN(date), MAX(date), COUNT(*) FROM {}",
            self.table
        );
        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(&query, [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(|e: rusqlite::Error| PricecastError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let min = NaiveDate::parse_from_str(&min_str, "%Y-%m-%d").map_err(|e| {
                    PricecastError::DataIntegrity {
                        reason: format!("stored date '{min_str}' is malformed: {e}"),
                    }
                })?;
                let max = NaiveDate::parse_from_str(&max_str, "%Y-%m-%d").map_err(|e| {
                    PricecastError::DataIntegrity {
                        reason: format!("stored date '{max_str}' is malformed: {e}"),
                    }
                })?;
                Ok(Some((min, max, count as usize)))
            }
            _ => Ok(None),
        }
    }
}
