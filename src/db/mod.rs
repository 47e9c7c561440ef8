//! Database abstraction layer.
//!
//! Provides a trait-based interface over the supported engines so the
//! materializer can capture rows without knowing which driver produced them.

mod postgres;
mod sqlite;
mod types;

pub use postgres::PostgresClient;
pub use sqlite::SqliteClient;
pub use types::{CellKind, CellValue, ResultSet, RowRecord};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

impl std::fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creates a database client for the given configuration.
///
/// This is the central factory function for database connections.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
    match config.backend {
        DatabaseBackend::Postgres => {
            let client = PostgresClient::connect(config).await?;
            Ok(Box::new(client))
        }
        DatabaseBackend::Sqlite => {
            let client = SqliteClient::connect(config).await?;
            Ok(Box::new(client))
        }
    }
}

/// A live connection capability the materializer runs queries against.
///
/// Implementations own a connection pool; each call to `fetch_records`
/// checks out one connection, runs one statement on it, and releases both
/// the cursor and the connection before returning.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// The engine behind this client.
    fn backend(&self) -> DatabaseBackend;

    /// Executes `sql` and captures every row it yields.
    ///
    /// Column names are taken from the prepared statement before the first
    /// row is read. Callers normally go through [`crate::materialize`], which
    /// also validates the statement.
    async fn fetch_records(&self, sql: &str) -> Result<ResultSet>;

    /// Closes the underlying pool.
    async fn close(&self) -> Result<()>;
}
