//! Database access.
//!
//! One connection, one parameterless SELECT, one [`ResultTable`]. The
//! connection is acquired here and closed before any rendering begins.
//! Failures are structured ([`LoadError`]); the pipeline-level helper
//! [`load_or_empty`] converts them into the empty-table sentinel the
//! renderers treat as "no data to process".

use crate::config::DatabaseConfig;
use crate::table::{ResultTable, Value};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Row};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

/// Structured data-access failure.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no database URL configured; set [database] url in .dbreport.toml or DBREPORT_DATABASE_URL")]
    MissingUrl,

    #[error("failed to connect to the database: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("query execution failed: {0}")]
    Query(#[source] sqlx::Error),
}

/// A live database handle scoped to a single report run.
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open a single-connection pool against the configured URL.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, LoadError> {
        if config.url.is_empty() {
            return Err(LoadError::MissingUrl);
        }

        info!("Connecting to database");
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(LoadError::Connection)?;

        Ok(Self { pool })
    }

    /// Execute one read-only SELECT and decode it into a [`ResultTable`].
    ///
    /// Column names are the aliases the query declared, in query order.
    pub async fn fetch(&self, sql: &str) -> Result<ResultTable, LoadError> {
        debug!("Executing query:\n{}", sql);

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(LoadError::Query)?;

        if rows.is_empty() {
            return Ok(ResultTable::empty());
        }

        let columns: Vec<String> = rows[0]
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let data: Vec<Vec<Value>> = rows
            .iter()
            .map(|row| (0..columns.len()).map(|i| decode_cell(row, i)).collect())
            .collect();

        info!("Loaded {} rows, {} columns", data.len(), columns.len());
        Ok(ResultTable::new(columns, data))
    }

    /// Close the connection. Must happen before rendering starts.
    pub async fn close(self) {
        self.pool.close().await;
        debug!("Database connection closed");
    }
}

/// Decode one cell into a [`Value`], widening every numeric type to f64.
fn decode_cell(row: &PgRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(Value::Number).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v.map(|n| Value::Number(n as f64)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(|n| Value::Number(n as f64)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map(|n| Value::Number(n as f64)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return v.map(|n| Value::Number(n as f64)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::Text).unwrap_or(Value::Null);
    }
    Value::Null
}

/// Connect, run one query, and release the connection.
pub async fn load_report_table(
    config: &DatabaseConfig,
    sql: &str,
) -> Result<ResultTable, LoadError> {
    let db = Database::connect(config).await?;
    let result = db.fetch(sql).await;
    db.close().await;
    result
}

/// Pipeline-level loader: any failure is logged and replaced with the
/// empty-table sentinel so the renderers degrade to a no-op.
pub async fn load_or_empty(config: &DatabaseConfig, sql: &str) -> ResultTable {
    match load_report_table(config, sql).await {
        Ok(table) => table,
        Err(e) => {
            error!("Data load failed: {}", e);
            println!("⚠️  Could not load data: {}", e);
            ResultTable::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_requires_url() {
        let config = DatabaseConfig::default();
        let err = Database::connect(&config).await.err().unwrap();
        assert!(matches!(err, LoadError::MissingUrl));
    }

    #[tokio::test]
    async fn test_load_or_empty_degrades_to_sentinel() {
        let config = DatabaseConfig::default();
        let table = load_or_empty(&config, "SELECT 1").await;
        assert!(table.is_empty());
    }
}
