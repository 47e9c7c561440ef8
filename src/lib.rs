//! SQL result transformer.
//!
//! Runs an arbitrary `SELECT` against PostgreSQL or SQLite, captures every
//! row into a driver-agnostic [`ResultSet`] of [`CellValue`]s keyed by column
//! name, and renders it with a pluggable [`Transformer`] (JSON ships in the
//! box).
//!
//! ```no_run
//! use sql_result_transformer::{db, transform_query, ConnectionConfig, JsonTransformer};
//!
//! # async fn run() -> sql_result_transformer::Result<()> {
//! let config = ConnectionConfig::from_connection_string("sqlite:///tmp/srt.db")?;
//! let client = db::connect(&config).await?;
//! let json = transform_query(client.as_ref(), "SELECT * FROM srt_test", &JsonTransformer::new()).await?;
//! println!("{}", String::from_utf8_lossy(&json));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod logging;
pub mod materialize;
pub mod transform;

pub use config::{Config, ConnectionConfig};
pub use db::{
    CellKind, CellValue, DatabaseBackend, DatabaseClient, PostgresClient, ResultSet, RowRecord,
    SqliteClient,
};
pub use error::{Result, SrtError};
pub use materialize::materialize;
pub use transform::{JsonLinesTransformer, JsonTransformer, Transformer};

use tracing::debug;

/// Materializes `sql` on `client` and renders the rows with `transformer`.
///
/// Either the complete output is returned or the first error encountered;
/// no partial output is ever produced.
pub async fn transform_query(
    client: &dyn DatabaseClient,
    sql: &str,
    transformer: &dyn Transformer,
) -> Result<Vec<u8>> {
    let result = materialize(client, sql).await?;
    let output = transformer.transform(&result)?;
    debug!(bytes = output.len(), "Transformed query result");
    Ok(output)
}
