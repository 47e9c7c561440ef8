//! Read-only statement guard.
//!
//! Parses the incoming SQL with sqlparser, using the backend's dialect, and
//! rejects anything that is not exactly one query. SQL the parser cannot
//! understand is rejected too: an unparsed string may hide a second statement.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::{Dialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;
use tracing::warn;

use crate::db::DatabaseBackend;
use crate::error::{Result, SrtError};

/// Ensures `sql` is a single statement that only reads data.
pub fn ensure_read_only(sql: &str, backend: DatabaseBackend) -> Result<()> {
    if sql.trim().is_empty() {
        return Err(reject("Empty SQL statement"));
    }

    let dialect = dialect_for(backend);
    let statements = match Parser::parse_sql(dialect.as_ref(), sql) {
        Ok(statements) => statements,
        Err(e) => return Err(reject(format!("Could not parse SQL: {e}"))),
    };

    match statements.as_slice() {
        [] => Err(reject("Empty SQL statement")),
        [statement] => check_statement(statement),
        many => Err(reject(format!(
            "Expected exactly one statement, found {}",
            many.len()
        ))),
    }
}

fn dialect_for(backend: DatabaseBackend) -> Box<dyn Dialect> {
    match backend {
        DatabaseBackend::Postgres => Box::new(PostgreSqlDialect {}),
        DatabaseBackend::Sqlite => Box::new(SQLiteDialect {}),
    }
}

fn reject(reason: impl Into<String>) -> SrtError {
    let reason = reason.into();
    warn!("Rejected statement: {reason}");
    SrtError::query(reason)
}

fn check_statement(statement: &Statement) -> Result<()> {
    match statement {
        Statement::Query(query) => {
            if query_is_read_only(query) {
                Ok(())
            } else {
                Err(reject("Query contains a data-modifying clause"))
            }
        }
        // Plain EXPLAIN never runs the statement; EXPLAIN ANALYZE does.
        Statement::Explain {
            analyze, statement, ..
        } => {
            if *analyze {
                check_statement(statement)
            } else {
                Ok(())
            }
        }
        other => Err(reject(format!(
            "Only read-only queries can be materialized, got {} statement",
            leading_keyword(other)
        ))),
    }
}

fn leading_keyword(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or("unknown")
        .to_uppercase()
}

/// Returns false if the query, its CTEs or any derived table modifies data.
fn query_is_read_only(query: &Query) -> bool {
    let ctes_read_only = query
        .with
        .as_ref()
        .map_or(true, |with| {
            with.cte_tables.iter().all(|cte| query_is_read_only(&cte.query))
        });

    ctes_read_only && set_expr_is_read_only(&query.body)
}

fn set_expr_is_read_only(set_expr: &SetExpr) -> bool {
    match set_expr {
        SetExpr::Select(select) => select_is_read_only(select),
        SetExpr::Query(query) => query_is_read_only(query),
        SetExpr::SetOperation { left, right, .. } => {
            set_expr_is_read_only(left) && set_expr_is_read_only(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => true,
        // INSERT / UPDATE / DELETE / MERGE bodies
        _ => false,
    }
}

fn select_is_read_only(select: &Select) -> bool {
    select.from.iter().all(table_with_joins_is_read_only)
}

fn table_with_joins_is_read_only(twj: &TableWithJoins) -> bool {
    table_factor_is_read_only(&twj.relation)
        && twj
            .joins
            .iter()
            .all(|join| table_factor_is_read_only(&join.relation))
}

fn table_factor_is_read_only(factor: &TableFactor) -> bool {
    match factor {
        TableFactor::Derived { subquery, .. } => query_is_read_only(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => table_with_joins_is_read_only(table_with_joins),
        _ => true,
    }
}
