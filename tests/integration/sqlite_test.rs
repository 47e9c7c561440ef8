//! SQLite materialization integration tests.
//!
//! Exercises column discovery, per-value typing and NULL/blob handling
//! against real database files.

use super::fixtures::{SqliteFixture, BLOB};
use pretty_assertions::assert_eq;
use sql_result_transformer::db;
use sql_result_transformer::{materialize, CellValue, ConnectionConfig, DatabaseBackend, SrtError};

#[tokio::test]
async fn test_scenario_rows_and_columns() {
    let fixture = SqliteFixture::scenario().await;

    let result = materialize(&fixture.client, "SELECT * FROM srt_test;")
        .await
        .unwrap();

    assert_eq!(result.len(), 4);
    assert_eq!(
        result.columns(),
        ["intField", "textField", "boolField", "realField", "blobField"]
    );

    for row in result.rows() {
        let mut keys: Vec<&str> = row.keys().collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["blobField", "boolField", "intField", "realField", "textField"]
        );
    }
}

#[tokio::test]
async fn test_scenario_values() {
    let fixture = SqliteFixture::scenario().await;
    let result = materialize(&fixture.client, "SELECT * FROM srt_test")
        .await
        .unwrap();
    let rows = result.rows();

    assert_eq!(rows[0].get("intField"), Some(&CellValue::Int(1)));
    assert_eq!(rows[0].get("textField"), Some(&CellValue::from("hello")));
    assert_eq!(rows[0].get("boolField"), Some(&CellValue::Bool(true)));
    assert_eq!(rows[0].get("realField"), Some(&CellValue::Float(1.0)));
    assert_eq!(rows[0].get("blobField"), Some(&CellValue::Blob(BLOB.to_vec())));

    assert_eq!(rows[1].get("boolField"), Some(&CellValue::Bool(false)));
    assert_eq!(rows[1].get("realField"), Some(&CellValue::Null));

    assert_eq!(rows[2].get("intField"), Some(&CellValue::Int(3)));
    assert_eq!(rows[2].get("textField"), Some(&CellValue::Null));
    assert_eq!(rows[2].get("boolField"), Some(&CellValue::Null));
    assert_eq!(rows[2].get("realField"), Some(&CellValue::Float(1.2)));
    assert_eq!(rows[2].get("blobField"), Some(&CellValue::Null));

    // NULL integers stay NULL rather than collapsing to zero.
    assert_eq!(rows[3].get("intField"), Some(&CellValue::Null));
    assert_eq!(rows[3].get("realField"), Some(&CellValue::Float(1.3)));
}

#[tokio::test]
async fn test_zero_rows_is_empty_result() {
    let fixture = SqliteFixture::scenario().await;

    let result = materialize(&fixture.client, "SELECT * FROM srt_test WHERE 1 = 0")
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.columns().len(), 5);
}

#[tokio::test]
async fn test_empty_blob_is_distinct_from_null() {
    let fixture = SqliteFixture::new(
        "CREATE TABLE blobs (id int, data blob);
         INSERT INTO blobs VALUES (1, X''), (2, NULL);",
    )
    .await;

    let result = materialize(&fixture.client, "SELECT data FROM blobs ORDER BY id")
        .await
        .unwrap();

    assert_eq!(result.rows()[0].get("data"), Some(&CellValue::Blob(Vec::new())));
    assert_eq!(result.rows()[1].get("data"), Some(&CellValue::Null));
}

#[tokio::test]
async fn test_json_text_is_kept_as_text() {
    let fixture = SqliteFixture::new(
        r#"CREATE TABLE docs (body json);
           INSERT INTO docs VALUES ('{"id": 1, "name": "person 1"}');"#,
    )
    .await;

    let result = materialize(&fixture.client, "SELECT body FROM docs")
        .await
        .unwrap();

    assert_eq!(
        result.rows()[0].get("body"),
        Some(&CellValue::from(r#"{"id": 1, "name": "person 1"}"#))
    );
}

#[tokio::test]
async fn test_syntax_error_is_query_error() {
    let fixture = SqliteFixture::scenario().await;

    let err = materialize(&fixture.client, "SELECT FROM WHERE")
        .await
        .unwrap_err();

    assert!(matches!(err, SrtError::Query(_)), "got {err:?}");
}

#[tokio::test]
async fn test_missing_table_is_query_error() {
    let fixture = SqliteFixture::scenario().await;

    let err = materialize(&fixture.client, "SELECT * FROM srt_missing")
        .await
        .unwrap_err();

    assert!(matches!(err, SrtError::Query(_)));
    assert!(err.to_string().contains("srt_missing"));
}

#[tokio::test]
async fn test_mutating_statement_is_rejected_before_execution() {
    let fixture = SqliteFixture::scenario().await;

    let err = materialize(&fixture.client, "DELETE FROM srt_test")
        .await
        .unwrap_err();
    assert!(matches!(err, SrtError::Query(_)));

    let err = materialize(&fixture.client, "SELECT 1; DELETE FROM srt_test")
        .await
        .unwrap_err();
    assert!(matches!(err, SrtError::Query(_)));

    let remaining = materialize(&fixture.client, "SELECT * FROM srt_test")
        .await
        .unwrap();
    assert_eq!(remaining.len(), 4);
}

#[tokio::test]
async fn test_unparseable_tail_does_not_run_leading_delete() {
    let fixture = SqliteFixture::new(
        "CREATE TABLE t (id int);
         CREATE INDEX ix ON t (id);
         INSERT INTO t VALUES (1), (2), (3);",
    )
    .await;

    for sql in [
        "DELETE FROM t; SELECT * FROM t INDEXED BY ix",
        "DELETE FROM t; SELECT * FROM t NOT INDEXED",
    ] {
        let err = materialize(&fixture.client, sql).await.unwrap_err();
        assert!(matches!(err, SrtError::Query(_)), "got {err:?}");
    }

    let count = materialize(&fixture.client, "SELECT count(*) AS n FROM t")
        .await
        .unwrap();
    assert_eq!(count.rows()[0].get("n"), Some(&CellValue::Int(3)));
}

#[tokio::test]
async fn test_connection_is_released_after_mid_cursor_failure() {
    let fixture = SqliteFixture::new(
        "CREATE TABLE nums (id int, v int);
         INSERT INTO nums VALUES (1, 1), (2, 2), (3, -9223372036854775807 - 1), (4, 4);",
    )
    .await;

    let mut config =
        ConnectionConfig::from_connection_string(&fixture.connection_string()).unwrap();
    config.max_connections = 1;
    let client = db::connect(&config).await.unwrap();

    // abs() of i64::MIN overflows once the cursor reaches the third row.
    let err = materialize(client.as_ref(), "SELECT id, abs(v) AS v FROM nums")
        .await
        .unwrap_err();
    assert!(matches!(err, SrtError::Query(_)), "got {err:?}");
    assert!(err.to_string().contains("integer overflow"), "{err}");

    // The single pooled connection must be back in the pool for this to succeed.
    let result = materialize(client.as_ref(), "SELECT id FROM nums")
        .await
        .unwrap();
    assert_eq!(result.len(), 4);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_connect_from_config() {
    let fixture = SqliteFixture::scenario().await;
    let config = ConnectionConfig::from_connection_string(&fixture.connection_string()).unwrap();

    let client = db::connect(&config).await.unwrap();
    assert_eq!(client.backend(), DatabaseBackend::Sqlite);

    let result = materialize(client.as_ref(), "SELECT intField FROM srt_test")
        .await
        .unwrap();
    assert_eq!(result.len(), 4);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_invocations_are_independent() {
    let fixture = SqliteFixture::scenario().await;

    let (all, some) = tokio::join!(
        materialize(&fixture.client, "SELECT * FROM srt_test"),
        materialize(
            &fixture.client,
            "SELECT textField FROM srt_test WHERE textField = 'hello'"
        ),
    );

    assert_eq!(all.unwrap().len(), 4);
    let some = some.unwrap();
    assert_eq!(some.len(), 2);
    assert_eq!(some.columns(), ["textField"]);
}
