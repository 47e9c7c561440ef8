//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient`
//! trait for PostgreSQL databases using sqlx.

use crate::config::ConnectionConfig;
use crate::db::{CellValue, DatabaseBackend, DatabaseClient, ResultSet};
use crate::error::{Result, SrtError};
use crate::materialize::capture_rows;
use async_trait::async_trait;
use sqlx::postgres::{
    PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode, PgValueFormat, PgValueRef,
};
use sqlx::{Column, Executor, Row, Statement, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// How long to wait for a pooled connection.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Leading format version byte of `jsonb` values in binary wire format.
const JSONB_FORMAT_VERSION: u8 = 1;

/// PostgreSQL database client.
#[derive(Debug, Clone)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Creates a new PostgresClient from an existing connection pool.
    ///
    /// The pool stays owned by the caller's side of the program; closing the
    /// client closes the pool for every clone.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connects to PostgreSQL, retrying transient failures with exponential backoff.
    ///
    /// `PG*` environment variables fill in whatever the config leaves unset.
    /// Every session starts with `default_transaction_read_only` on.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut resolved = config.clone();
        resolved.apply_env_defaults();
        let config = &resolved;
        let options = connect_options(config)?;

        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut attempt = 1;

        loop {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
                .connect_with(options.clone())
                .await;

            match result {
                Ok(pool) => {
                    debug!("Connected to {}", config.display_string());
                    return Ok(Self { pool });
                }
                Err(e) if attempt < MAX_RETRY_ATTEMPTS && is_transient_error(&e) => {
                    warn!(
                        "Connection attempt {} failed (transient error), retrying in {:?}",
                        attempt, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(map_connection_error(e, config)),
            }
        }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
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

/// Builds connect options from the config: read-only sessions, TLS mode and
/// the server-side statement timeout.
fn connect_options(config: &ConnectionConfig) -> Result<PgConnectOptions> {
    let database = config
        .database
        .as_deref()
        .ok_or_else(|| SrtError::config("Database name is required"))?;

    let mut options = PgConnectOptions::new()
        .host(config.host.as_deref().unwrap_or("localhost"))
        .port(config.port)
        .database(database)
        .options([("default_transaction_read_only", "on")]);

    if let Some(user) = &config.user {
        options = options.username(user);
    }
    if let Some(password) = &config.password {
        options = options.password(password);
    }
    if let Some(secs) = config.statement_timeout_secs {
        options = options.options([("statement_timeout", format!("{secs}s"))]);
    }
    if let Some(mode) = &config.sslmode {
        let ssl_mode = PgSslMode::from_str(mode)
            .map_err(|e| SrtError::config(format!("Invalid sslmode '{mode}': {e}")))?;
        options = options.ssl_mode(ssl_mode);
    }

    Ok(options)
}

/// Decodes one cell of a PgRow, dispatching on the column's reported type.
fn decode_cell(row: &PgRow, index: usize) -> std::result::Result<CellValue, String> {
    let raw = row.try_get_raw(index).map_err(|e| e.to_string())?;
    if raw.is_null() {
        return Ok(CellValue::Null);
    }

    let type_info = raw.type_info();
    let cell = match type_info.name() {
        "BOOL" => row.try_get_unchecked::<bool, _>(index).map(CellValue::Bool),
        "INT2" => row.try_get_unchecked::<i16, _>(index).map(CellValue::from),
        "INT4" => row.try_get_unchecked::<i32, _>(index).map(CellValue::from),
        "INT8" => row.try_get_unchecked::<i64, _>(index).map(CellValue::Int),
        "FLOAT4" => row.try_get_unchecked::<f32, _>(index).map(CellValue::from),
        "FLOAT8" => row.try_get_unchecked::<f64, _>(index).map(CellValue::Float),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "UNKNOWN" => {
            row.try_get_unchecked::<String, _>(index).map(CellValue::Text)
        }
        "BYTEA" => row.try_get_unchecked::<Vec<u8>, _>(index).map(CellValue::Blob),
        "JSON" => return raw_document(&raw, false).map(CellValue::Blob),
        "JSONB" => return raw_document(&raw, true).map(CellValue::Blob),
        other => return Err(format!("unsupported column type {other}")),
    };

    cell.map_err(|e| e.to_string())
}

/// Returns the document bytes of a json/jsonb value exactly as the server sent them.
fn raw_document(value: &PgValueRef<'_>, jsonb: bool) -> std::result::Result<Vec<u8>, String> {
    let bytes = value.as_bytes().map_err(|e| e.to_string())?;

    if !jsonb || !matches!(value.format(), PgValueFormat::Binary) {
        return Ok(bytes.to_vec());
    }

    match bytes.split_first() {
        Some((&JSONB_FORMAT_VERSION, document)) => Ok(document.to_vec()),
        Some((version, _)) => Err(format!("unsupported jsonb format version {version}")),
        None => Err("empty jsonb value".to_string()),
    }
}

fn query_error(error: sqlx::Error) -> SrtError {
    SrtError::query(format_query_error(error))
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    // Authentication and database-not-found errors are never transient
    if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
        || error_str.contains("does not exist")
        || error_str.contains("ssl")
        || error_str.contains("tls")
    {
        return false;
    }

    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> SrtError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        SrtError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        SrtError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        SrtError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        SrtError::connection(
            "Server requires SSL. Add '?sslmode=require' to connection string.".to_string(),
        )
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        SrtError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        SrtError::connection(error.to_string())
    }
}

/// Formats a query error, appending server-supplied detail fields.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        let fields = [
            ("DETAIL", pg_error.detail()),
            ("HINT", pg_error.hint()),
            ("TABLE", pg_error.table()),
            ("COLUMN", pg_error.column()),
            ("CONSTRAINT", pg_error.constraint()),
        ];

        for (label, value) in fields {
            if let Some(value) = value {
                result.push_str("\n  ");
                result.push_str(label);
                result.push_str(": ");
                result.push_str(value);
            }
        }
    }

    result
}
