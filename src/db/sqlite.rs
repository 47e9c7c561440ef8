//! SQLite database client implementation.
//!
//! SQLite types values, not columns: the same column can hold an INTEGER in
//! one row and TEXT in the next. Cells are therefore decoded by each value's
//! storage class, consulting the declared column type only to recover
//! booleans.

use crate::config::ConnectionConfig;
use crate::db::{CellValue, DatabaseBackend, DatabaseClient, ResultSet};
use crate::error::{Result, SrtError};
use crate::materialize::capture_rows;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row, Statement, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// How long to wait for a pooled connection.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Declared type name sqlx reports for `BOOLEAN`/`BOOL` columns.
const DECLARED_BOOLEAN: &str = "BOOLEAN";

/// SQLite database client.
#[derive(Debug, Clone)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Creates a new SqliteClient from an existing connection pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens the database file named by `config.database`.
    ///
    /// The file must already exist and is opened read-only. An in-memory
    /// database is pinned to a single connection that never expires, so every
    /// query sees the same data.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let options = connect_options(config)?;

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS));

        if config.is_in_memory() {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            SrtError::connection(format!(
                "Cannot open SQLite database '{}': {e}",
                config.database.as_deref().unwrap_or("unknown")
            ))
        })?;

        debug!("Connected to {}", config.display_string());
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn fetch_records(&self, sql: &str) -> Result<ResultSet> {
        let mut conn = self.pool.acquire().await.map_err(query_error)?;

        let statement = (&mut *conn).prepare(sql).await.map_err(query_error)?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect();
        debug!("Statement reports {} columns", columns.len());

        let rows = statement.query().fetch(&mut *conn);
        capture_rows(columns, rows, decode_cell, query_error).await
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn connect_options(config: &ConnectionConfig) -> Result<SqliteConnectOptions> {
    if config.is_in_memory() {
        return SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| SrtError::config(format!("Invalid SQLite options: {e}")));
    }

    let path = config
        .database
        .as_deref()
        .ok_or_else(|| SrtError::config("SQLite database path is required"))?;

    Ok(SqliteConnectOptions::new().filename(path).read_only(true))
}

/// Decodes one cell of a SqliteRow by the value's storage class.
fn decode_cell(row: &SqliteRow, index: usize) -> std::result::Result<CellValue, String> {
    let raw = row.try_get_raw(index).map_err(|e| e.to_string())?;
    if raw.is_null() {
        return Ok(CellValue::Null);
    }

    let storage = raw.type_info();
    let cell = match storage.name() {
        "INTEGER" => {
            let declared_bool = row
                .columns()
                .get(index)
                .is_some_and(|col| col.type_info().name() == DECLARED_BOOLEAN);

            row.try_get_unchecked::<i64, _>(index).map(|v| {
                if declared_bool {
                    CellValue::Bool(v != 0)
                } else {
                    CellValue::Int(v)
                }
            })
        }
        "REAL" => row.try_get_unchecked::<f64, _>(index).map(CellValue::Float),
        "TEXT" => row.try_get_unchecked::<String, _>(index).map(CellValue::Text),
        "BLOB" => row.try_get_unchecked::<Vec<u8>, _>(index).map(CellValue::Blob),
        other => return Err(format!("unsupported storage class {other}")),
    };

    cell.map_err(|e| e.to_string())
}

fn query_error(error: sqlx::Error) -> SrtError {
    match error.as_database_error() {
        Some(db_error) => SrtError::query(format!("ERROR: {}", db_error.message())),
        None => SrtError::query(error.to_string()),
    }
}
