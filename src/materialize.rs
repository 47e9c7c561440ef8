//! Result materialization.
//!
//! Runs one read-only statement and realizes every row it yields into an
//! in-memory [`ResultSet`]. Backends plug in through [`capture_rows`] by
//! supplying a per-cell decoder; the loop itself (column naming, abort on the
//! first failure, no partial results) is shared.

use crate::db::{CellValue, DatabaseClient, ResultSet, RowRecord};
use crate::error::{Result, SrtError};
use crate::guard;
use futures::{Stream, TryStreamExt};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Executes `sql` on `client` and returns all of its rows.
///
/// The statement must be a single query; anything else is rejected with
/// [`SrtError::Query`] before the database is contacted. Zero rows yield an
/// empty result set, not an error.
pub async fn materialize(client: &dyn DatabaseClient, sql: &str) -> Result<ResultSet> {
    let backend = client.backend();
    guard::ensure_read_only(sql, backend)?;

    debug!(%backend, "Materializing query");
    let start = Instant::now();

    let result = client.fetch_records(sql).await?;

    info!(
        %backend,
        rows = result.len(),
        columns = result.columns().len(),
        "Materialized query in {:?}",
        start.elapsed()
    );

    Ok(result)
}

/// Drains a row stream into a [`ResultSet`].
///
/// `columns` is the name list discovered from the statement before the first
/// row; `decode` turns the cell at a column index into a [`CellValue`], and
/// `on_query_error` maps driver errors raised while advancing the cursor.
/// The stream is dropped on every return path, which releases the cursor.
pub(crate) async fn capture_rows<R, S, D, E>(
    columns: Vec<String>,
    mut rows: S,
    decode: D,
    on_query_error: E,
) -> Result<ResultSet>
where
    S: Stream<Item = std::result::Result<R, sqlx::Error>> + Unpin,
    D: Fn(&R, usize) -> std::result::Result<CellValue, String>,
    E: Fn(sqlx::Error) -> SrtError,
{
    warn_on_duplicate_columns(&columns);

    let mut records = Vec::new();

    while let Some(row) = rows.try_next().await.map_err(&on_query_error)? {
        let mut record = RowRecord::with_capacity(columns.len());

        for (index, name) in columns.iter().enumerate() {
            let cell = decode(&row, index)
                .map_err(|message| SrtError::scan(records.len(), name.as_str(), message))?;
            // Duplicate names: the last column wins.
            record.insert(name.clone(), cell);
        }

        records.push(record);
    }

    Ok(ResultSet::new(columns, records))
}

fn warn_on_duplicate_columns(columns: &[String]) {
    let mut seen = HashSet::with_capacity(columns.len());
    for name in columns {
        if !seen.insert(name.as_str()) {
            warn!(
                "Column '{}' appears more than once; the last occurrence is kept",
                name
            );
        }
    }
}
